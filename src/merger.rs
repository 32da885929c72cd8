//! K-way chunk merger.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::chunk::ChunkCursor;
use crate::sort::SortError;
use crate::value::Value;

/// One (value, cursor index) pair on the merge frontier.
///
/// The ordering is reversed so that the std max-heap pops the smallest
/// value first and, on exact value ties, the lowest cursor index. The tie
/// rule makes the emission order of equal values from different chunks
/// deterministic across runs.
#[derive(Debug, PartialEq, Eq)]
struct FrontierEntry {
    value: Value,
    cursor: usize,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .cmp(&self.value)
            .then_with(|| other.cursor.cmp(&self.cursor))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Merges all sorted chunk streams into a single ascending stream.
///
/// The merger is the sole owner of its cursors; they live exactly as long
/// as the merge. Time complexity is *m* \* log(*k*) in the worst case
/// where *m* is the total number of values and *k* the number of chunks.
pub struct KWayMerger {
    cursors: Vec<ChunkCursor>,
    frontier: BinaryHeap<FrontierEntry>,
    initiated: bool,
}

impl KWayMerger {
    /// Creates a merger driving `cursors` to completion.
    /// Each cursor's chunk must be sorted in ascending order, otherwise
    /// the result is undefined.
    pub fn new(cursors: Vec<ChunkCursor>) -> Self {
        let frontier = BinaryHeap::with_capacity(cursors.len());

        return KWayMerger {
            cursors,
            frontier,
            initiated: false,
        };
    }

    /// Number of chunk streams being merged.
    pub fn chunk_count(&self) -> usize {
        self.cursors.len()
    }

    /// Moves the next record of cursor `idx`, if any, onto the frontier.
    fn refill(&mut self, idx: usize) -> Result<(), SortError> {
        if self.cursors[idx].has_more()? {
            self.frontier.push(FrontierEntry {
                value: self.cursors[idx].current(),
                cursor: idx,
            });
            self.cursors[idx].advance();
        }

        Ok(())
    }
}

impl Iterator for KWayMerger {
    type Item = Result<Value, SortError>;

    /// Returns the smallest value still unconsumed across all chunks.
    /// `None` means every chunk is exhausted; there is no further step.
    fn next(&mut self) -> Option<Self::Item> {
        if !self.initiated {
            for idx in 0..self.cursors.len() {
                if let Err(err) = self.refill(idx) {
                    return Some(Err(err));
                }
            }
            self.initiated = true;
        }

        let entry = self.frontier.pop()?;
        if let Err(err) = self.refill(entry.cursor) {
            return Some(Err(err));
        }

        return Some(Ok(entry.value));
    }
}

#[cfg(test)]
mod test {
    use std::collections::BinaryHeap;
    use std::fs;

    use rstest::*;

    use super::{FrontierEntry, KWayMerger};
    use crate::chunk::{Chunk, ChunkCursor};
    use crate::sort::SortError;
    use crate::value::Value;

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn make_cursors(dir: &tempfile::TempDir, chunks: Vec<Vec<f64>>) -> Vec<ChunkCursor> {
        chunks
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| {
                let values = raw.into_iter().map(|v| Value::new(v).unwrap());
                Chunk::create(dir.path(), idx, values, None).unwrap().open(None).unwrap()
            })
            .collect()
    }

    #[rstest]
    #[case(vec![], vec![])]
    #[case(vec![vec![], vec![]], vec![])]
    #[case(
        vec![
            vec![4.0, 5.0, 7.0],
            vec![1.0, 6.0],
            vec![3.0],
            vec![],
        ],
        vec![1.0, 3.0, 4.0, 5.0, 6.0, 7.0],
    )]
    #[case(
        vec![
            vec![1.0, 1.0],
            vec![1.0],
        ],
        vec![1.0, 1.0, 1.0],
    )]
    #[case(
        vec![
            vec![-3.5, 0.25],
            vec![-7.0, 8.0],
        ],
        vec![-7.0, -3.5, 0.25, 8.0],
    )]
    fn test_merger(
        tmp_dir: tempfile::TempDir,
        #[case] chunks: Vec<Vec<f64>>,
        #[case] expected: Vec<f64>,
    ) {
        let merger = KWayMerger::new(make_cursors(&tmp_dir, chunks));

        let merged: Result<Vec<f64>, SortError> = merger.map(|item| item.map(Value::get)).collect();
        assert_eq!(merged.unwrap(), expected);
    }

    #[rstest]
    fn test_merger_surfaces_corruption(tmp_dir: tempfile::TempDir) {
        let chunk = Chunk::create(tmp_dir.path(), 0, [Value::new(1.0).unwrap()], None).unwrap();
        fs::write(chunk.path(), "not a number\n").unwrap();

        let mut merger = KWayMerger::new(vec![chunk.open(None).unwrap()]);
        let item = merger.next().unwrap();
        assert!(matches!(item, Err(SortError::ChunkCorrupt { index: 0, .. })));
    }

    #[test]
    fn test_frontier_prefers_smaller_value_then_lower_cursor() {
        let small = FrontierEntry { value: "1".parse().unwrap(), cursor: 5 };
        let large = FrontierEntry { value: "2".parse().unwrap(), cursor: 0 };
        // greater means popped first on the max-heap
        assert!(small > large);

        let first = FrontierEntry { value: "1".parse().unwrap(), cursor: 0 };
        let second = FrontierEntry { value: "1".parse().unwrap(), cursor: 1 };
        assert!(first > second);
    }

    #[test]
    fn test_equal_values_pop_in_cursor_order() {
        let mut frontier = BinaryHeap::new();
        for cursor in [2usize, 0, 1] {
            frontier.push(FrontierEntry { value: "7".parse().unwrap(), cursor });
        }

        let order: Vec<usize> = std::iter::from_fn(|| frontier.pop().map(|entry| entry.cursor)).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
