//! External sorter.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use log;

use crate::buffer::{ChunkBuffer, ChunkBufferBuilder, CountLimitedBufferBuilder};
use crate::chunk::Chunk;
use crate::merger::KWayMerger;
use crate::value::{ParseValueError, Value};

/// Sorting error. Every variant is fatal: the first failure aborts the
/// run, nothing is recovered or retried. Chunks already written when a
/// failure occurs stay in the temporary directory until the sorter is
/// dropped.
#[derive(Debug)]
pub enum SortError {
    /// Temporary chunk directory creation error.
    TempDir(io::Error),
    /// The input file could not be opened for reading.
    InputOpen { path: PathBuf, source: io::Error },
    /// Reading the input stream failed mid-run.
    InputRead(io::Error),
    /// An input record is not a finite numeric literal.
    MalformedValue {
        line: u64,
        text: String,
        source: ParseValueError,
    },
    /// A chunk artifact could not be created or written.
    ChunkWrite { index: usize, source: io::Error },
    /// A previously written chunk could not be reopened for reading.
    ChunkOpen {
        index: usize,
        path: PathBuf,
        source: io::Error,
    },
    /// Reading a chunk failed during the merge.
    ChunkRead { index: usize, source: io::Error },
    /// A persisted chunk record failed to parse back.
    ChunkCorrupt { index: usize, record: String },
    /// The output file could not be created.
    OutputOpen { path: PathBuf, source: io::Error },
    /// Writing the output stream failed.
    OutputWrite(io::Error),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SortError::TempDir(err) => Some(err),
            SortError::InputOpen { source, .. } => Some(source),
            SortError::InputRead(err) => Some(err),
            SortError::MalformedValue { source, .. } => Some(source),
            SortError::ChunkWrite { source, .. } => Some(source),
            SortError::ChunkOpen { source, .. } => Some(source),
            SortError::ChunkRead { source, .. } => Some(source),
            SortError::ChunkCorrupt { .. } => None,
            SortError::OutputOpen { source, .. } => Some(source),
            SortError::OutputWrite(err) => Some(err),
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortError::TempDir(err) => write!(f, "temporary chunk directory not created: {}", err),
            SortError::InputOpen { path, source } => {
                write!(f, "input file {} not opened: {}", path.display(), source)
            }
            SortError::InputRead(err) => write!(f, "input stream read failed: {}", err),
            SortError::MalformedValue { line, text, source } => {
                write!(f, "input line {} ({:?}) rejected: {}", line, text, source)
            }
            SortError::ChunkWrite { index, source } => write!(f, "chunk {} not written: {}", index, source),
            SortError::ChunkOpen { index, path, source } => {
                write!(f, "chunk {} ({}) not reopened: {}", index, path.display(), source)
            }
            SortError::ChunkRead { index, source } => write!(f, "chunk {} read failed: {}", index, source),
            SortError::ChunkCorrupt { index, record } => {
                write!(f, "chunk {} holds an unreadable record {:?}", index, record)
            }
            SortError::OutputOpen { path, source } => {
                write!(f, "output file {} not created: {}", path.display(), source)
            }
            SortError::OutputWrite(err) => write!(f, "output stream write failed: {}", err),
        }
    }
}

/// Counts reported by a completed [`ExternalSorter::sort_file`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSummary {
    /// Number of chunks the input was split into.
    pub chunks: usize,
    /// Number of values written to the output.
    pub values: u64,
}

/// External sorter builder. Provides methods for [`ExternalSorter`] initialization.
#[derive(Clone)]
pub struct ExternalSorterBuilder<B = CountLimitedBufferBuilder>
where
    B: ChunkBufferBuilder,
{
    /// Directory to host the temporary chunk directory.
    tmp_dir: Option<Box<Path>>,
    /// Chunk file read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Chunk buffer builder.
    buffer_builder: B,
}

impl<B> ExternalSorterBuilder<B>
where
    B: ChunkBufferBuilder,
{
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        ExternalSorterBuilder::default()
    }

    /// Builds an [`ExternalSorter`] instance using provided configuration.
    pub fn build(self) -> Result<ExternalSorter<B>, SortError> {
        ExternalSorter::new(self.tmp_dir.as_deref(), self.buffer_builder, self.rw_buf_size)
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> ExternalSorterBuilder<B> {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets buffer builder.
    pub fn with_buffer(mut self, buffer_builder: B) -> ExternalSorterBuilder<B> {
        self.buffer_builder = buffer_builder;
        return self;
    }

    /// Sets chunk read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> ExternalSorterBuilder<B> {
        self.rw_buf_size = Some(buf_size);
        return self;
    }
}

impl<B> Default for ExternalSorterBuilder<B>
where
    B: ChunkBufferBuilder,
{
    fn default() -> Self {
        ExternalSorterBuilder {
            tmp_dir: None,
            rw_buf_size: None,
            buffer_builder: B::default(),
        }
    }
}

/// External sorter.
///
/// Sorting runs in two strictly ordered phases. The split phase reads
/// values into a bounded buffer, sorts each full buffer and persists it as
/// an immutable chunk; every chunk writer is closed before the phase ends.
/// The merge phase then opens one read cursor per chunk and merges all of
/// them into a single ascending stream. Peak memory is bounded by the
/// buffer budget since only one buffer is live at a time.
pub struct ExternalSorter<B = CountLimitedBufferBuilder>
where
    B: ChunkBufferBuilder,
{
    /// Directory holding the chunk artifacts.
    tmp_dir: tempfile::TempDir,
    /// Chunk buffer builder.
    buffer_builder: B,
    /// Chunk file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl<B> ExternalSorter<B>
where
    B: ChunkBufferBuilder,
{
    /// Creates a new external sorter instance.
    ///
    /// # Arguments
    /// * `tmp_path` - Directory to be used to store temporary data. If the parameter is [`None`]
    ///   the default OS temporary directory will be used.
    /// * `buffer_builder` - An instance of a buffer builder that will be used for chunk buffer creation.
    /// * `rw_buf_size` - Chunk file read/write buffer size.
    pub fn new(tmp_path: Option<&Path>, buffer_builder: B, rw_buf_size: Option<usize>) -> Result<Self, SortError> {
        return Ok(ExternalSorter {
            rw_buf_size,
            buffer_builder,
            tmp_dir: Self::init_tmp_directory(tmp_path)?,
        });
    }

    fn init_tmp_directory(tmp_path: Option<&Path>) -> Result<tempfile::TempDir, SortError> {
        let tmp_dir = if let Some(tmp_path) = tmp_path {
            tempfile::tempdir_in(tmp_path)
        } else {
            tempfile::tempdir()
        }
        .map_err(SortError::TempDir)?;

        log::info!("using {} as a chunk directory", tmp_dir.path().display());

        return Ok(tmp_dir);
    }

    /// Splits the input into sorted persisted chunks and returns them in
    /// creation order; their count is the chunk count of the run.
    ///
    /// Records are read one line at a time into a bounded buffer; each
    /// time the buffer reaches its budget it is sorted and persisted as
    /// the next chunk. Blank lines carry no record and are skipped. Any
    /// other line that does not parse as a finite number aborts the run
    /// with [`SortError::MalformedValue`] naming the line; no default
    /// value is ever substituted.
    pub fn split<R>(&self, input: R) -> Result<Vec<Chunk>, SortError>
    where
        R: io::BufRead,
    {
        let mut chunks = Vec::new();
        let mut chunk_buf = self.buffer_builder.build();

        for (line_idx, line) in input.lines().enumerate() {
            let line = line.map_err(SortError::InputRead)?;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            let value: Value = text.parse().map_err(|err| SortError::MalformedValue {
                line: line_idx as u64 + 1,
                text: text.to_string(),
                source: err,
            })?;
            chunk_buf.push(value);

            if chunk_buf.is_full() {
                let chunk = self.create_chunk(chunk_buf, chunks.len())?;
                chunks.push(chunk);
                chunk_buf = self.buffer_builder.build();
            }
        }

        if chunk_buf.len() > 0 {
            let chunk = self.create_chunk(chunk_buf, chunks.len())?;
            chunks.push(chunk);
        }

        log::debug!("split done, {} chunks written", chunks.len());

        return Ok(chunks);
    }

    /// Sorts data from the input stream.
    /// Returns an iterator that can be used to get the sorted data stream.
    ///
    /// # Arguments
    /// * `input` - Input stream data to be fetched from
    pub fn sort<R>(&self, input: R) -> Result<KWayMerger, SortError>
    where
        R: io::BufRead,
    {
        let chunks = self.split(input)?;

        let mut cursors = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            cursors.push(chunk.open(self.rw_buf_size)?);
        }

        log::debug!("merging {} chunks", cursors.len());

        return Ok(KWayMerger::new(cursors));
    }

    /// Runs the whole batch transformation: sorts the `input` file into
    /// the `output` file and reports the resulting counts.
    pub fn sort_file(&self, input: &Path, output: &Path) -> Result<SortSummary, SortError> {
        let input_file = fs::File::open(input).map_err(|err| SortError::InputOpen {
            path: input.to_path_buf(),
            source: err,
        })?;

        let sorted = self.sort(io::BufReader::new(input_file))?;
        let chunks = sorted.chunk_count();

        let output_file = fs::File::create(output).map_err(|err| SortError::OutputOpen {
            path: output.to_path_buf(),
            source: err,
        })?;
        let mut output_writer = io::BufWriter::new(output_file);

        let mut values = 0;
        for value in sorted {
            writeln!(output_writer, "{}", value?).map_err(SortError::OutputWrite)?;
            values += 1;
        }
        output_writer.flush().map_err(SortError::OutputWrite)?;

        log::info!("sorted {} values through {} chunks", values, chunks);

        return Ok(SortSummary { chunks, values });
    }

    fn create_chunk(&self, mut buffer: B::Buffer, index: usize) -> Result<Chunk, SortError> {
        log::debug!("sorting chunk {} ({} values)", index, buffer.len());
        buffer.as_mut_slice().sort_unstable();

        log::debug!("saving chunk {}", index);
        return Chunk::create(self.tmp_dir.path(), index, buffer, self.rw_buf_size);
    }
}
