//! Persisted chunks and their read cursors.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use crate::sort::SortError;
use crate::value::Value;

/// One persisted chunk: an immutable file of newline-delimited values in
/// ascending order, identified by its zero-based sequence index.
///
/// A chunk is written once by [`Chunk::create`] and never modified
/// afterwards; the merge phase reads it through [`Chunk::open`].
#[derive(Debug)]
pub struct Chunk {
    index: usize,
    path: PathBuf,
}

impl Chunk {
    /// Persists `values` as chunk number `index` under `dir`.
    /// The values must already be sorted ascending. The chunk file is
    /// flushed and closed before this returns.
    pub fn create(
        dir: &Path,
        index: usize,
        values: impl IntoIterator<Item = Value>,
        buf_size: Option<usize>,
    ) -> Result<Self, SortError> {
        let path = dir.join(format!("{}.txt", index));
        let file = fs::File::create(&path).map_err(|err| SortError::ChunkWrite { index, source: err })?;

        let mut chunk_writer = match buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
            None => io::BufWriter::new(file),
        };

        for value in values {
            writeln!(chunk_writer, "{}", value).map_err(|err| SortError::ChunkWrite { index, source: err })?;
        }

        chunk_writer
            .flush()
            .map_err(|err| SortError::ChunkWrite { index, source: err })?;

        return Ok(Chunk { index, path });
    }

    /// Chunk sequence number.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Path of the chunk artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reopens the chunk for reading and returns a cursor positioned
    /// before its first value.
    pub fn open(&self, buf_size: Option<usize>) -> Result<ChunkCursor, SortError> {
        let file = fs::File::open(&self.path).map_err(|err| SortError::ChunkOpen {
            index: self.index,
            path: self.path.clone(),
            source: err,
        })?;

        let reader = match buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        Ok(ChunkCursor {
            index: self.index,
            reader,
            line: String::new(),
            state: CursorState::Unprimed,
        })
    }
}

#[derive(Debug)]
enum CursorState {
    Unprimed,
    Ready(Value),
    Exhausted,
}

/// Forward-only cursor over one chunk's records.
///
/// The cursor moves through three states: unprimed (no record fetched),
/// ready (a record is available through [`ChunkCursor::current`]) and
/// exhausted. Exhaustion is terminal. Records are fetched lazily, one at
/// a time, on the first [`ChunkCursor::has_more`] call after construction
/// or after an [`ChunkCursor::advance`].
#[derive(Debug)]
pub struct ChunkCursor {
    index: usize,
    reader: io::BufReader<fs::File>,
    line: String,
    state: CursorState,
}

impl ChunkCursor {
    /// Index of the chunk this cursor reads.
    pub fn index(&self) -> usize {
        self.index
    }

    /// True if an unconsumed value is available, fetching the next record
    /// if needed. Idempotent: repeated calls without an intervening
    /// [`ChunkCursor::advance`] neither move the position nor re-read.
    pub fn has_more(&mut self) -> Result<bool, SortError> {
        if matches!(self.state, CursorState::Unprimed) {
            self.state = match self.read_record()? {
                Some(value) => CursorState::Ready(value),
                None => CursorState::Exhausted,
            };
        }

        Ok(matches!(self.state, CursorState::Ready(_)))
    }

    /// The most recently fetched value.
    ///
    /// # Panics
    ///
    /// Panics unless the preceding [`ChunkCursor::has_more`] call
    /// returned `true`.
    pub fn current(&self) -> Value {
        match self.state {
            CursorState::Ready(value) => value,
            _ => panic!("cursor holds no value, call has_more() first"),
        }
    }

    /// Marks the current value as consumed; the next
    /// [`ChunkCursor::has_more`] call fetches the following record.
    ///
    /// # Panics
    ///
    /// Panics if there is no current value to consume.
    pub fn advance(&mut self) {
        match self.state {
            CursorState::Ready(_) => self.state = CursorState::Unprimed,
            _ => panic!("cursor holds no value, call has_more() first"),
        }
    }

    // End of file is the only exhaustion signal. A record that does not
    // parse back is corruption, never exhaustion: the crate wrote every
    // chunk record itself.
    fn read_record(&mut self) -> Result<Option<Value>, SortError> {
        self.line.clear();
        let read = self.reader.read_line(&mut self.line).map_err(|err| SortError::ChunkRead {
            index: self.index,
            source: err,
        })?;

        if read == 0 {
            return Ok(None);
        }

        let record = self.line.trim_end();
        match record.parse() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(SortError::ChunkCorrupt {
                index: self.index,
                record: record.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use rstest::*;

    use super::{Chunk, ChunkCursor};
    use crate::sort::SortError;
    use crate::value::Value;

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn values(raw: &[f64]) -> Vec<Value> {
        raw.iter().map(|&v| Value::new(v).unwrap()).collect()
    }

    fn drain(mut cursor: ChunkCursor) -> Vec<f64> {
        let mut out = Vec::new();
        while cursor.has_more().unwrap() {
            out.push(cursor.current().get());
            cursor.advance();
        }
        out
    }

    #[rstest]
    fn test_chunk_round_trip(tmp_dir: tempfile::TempDir) {
        let chunk = Chunk::create(tmp_dir.path(), 0, values(&[-2.5, 0.0, 17.25]), None).unwrap();

        assert_eq!(chunk.index(), 0);
        assert_eq!(drain(chunk.open(None).unwrap()), vec![-2.5, 0.0, 17.25]);
    }

    #[rstest]
    fn test_cursor_fetches_lazily_and_idempotently(tmp_dir: tempfile::TempDir) {
        let chunk = Chunk::create(tmp_dir.path(), 0, values(&[1.0, 2.0]), None).unwrap();
        let mut cursor = chunk.open(None).unwrap();

        assert!(cursor.has_more().unwrap());
        assert!(cursor.has_more().unwrap());
        assert_eq!(cursor.current().get(), 1.0);
        assert_eq!(cursor.current().get(), 1.0);

        cursor.advance();
        assert!(cursor.has_more().unwrap());
        assert_eq!(cursor.current().get(), 2.0);

        cursor.advance();
        assert!(!cursor.has_more().unwrap());
        assert!(!cursor.has_more().unwrap());
    }

    #[rstest]
    #[should_panic]
    fn test_current_before_fetch_panics(tmp_dir: tempfile::TempDir) {
        let chunk = Chunk::create(tmp_dir.path(), 0, values(&[1.0]), None).unwrap();
        let cursor = chunk.open(None).unwrap();

        cursor.current();
    }

    #[rstest]
    fn test_empty_chunk_is_exhausted_immediately(tmp_dir: tempfile::TempDir) {
        let chunk = Chunk::create(tmp_dir.path(), 3, values(&[]), None).unwrap();
        let mut cursor = chunk.open(None).unwrap();

        assert_eq!(chunk.index(), 3);
        assert!(!cursor.has_more().unwrap());
    }

    #[rstest]
    fn test_garbage_record_is_corruption_not_exhaustion(tmp_dir: tempfile::TempDir) {
        let chunk = Chunk::create(tmp_dir.path(), 0, values(&[1.0]), None).unwrap();
        fs::write(chunk.path(), "1\nbogus\n2\n").unwrap();

        let mut cursor = chunk.open(None).unwrap();
        assert!(cursor.has_more().unwrap());
        cursor.advance();

        let err = cursor.has_more().unwrap_err();
        assert!(matches!(err, SortError::ChunkCorrupt { index: 0, .. }));
    }

    #[rstest]
    fn test_missing_chunk_file_reported(tmp_dir: tempfile::TempDir) {
        let chunk = Chunk::create(tmp_dir.path(), 5, values(&[1.0]), None).unwrap();
        fs::remove_file(chunk.path()).unwrap();

        let err = chunk.open(None).unwrap_err();
        assert!(matches!(err, SortError::ChunkOpen { index: 5, .. }));
    }
}
