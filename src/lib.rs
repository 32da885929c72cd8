//! `numsort` sorts numeric datasets that do not fit into main memory.
//!
//! Sorting is achieved in two passes over durable storage. During the first
//! pass the input is read into a bounded in-memory buffer; every time the
//! buffer reaches its budget it is sorted and persisted as an immutable
//! chunk file. During the second pass all chunk files are merged together
//! with a k-way merge that repeatedly emits the smallest value still
//! unconsumed across the chunks. Peak memory stays bounded by the chunk
//! budget no matter how large the input is. For more information see
//! [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! `numsort` supports the following features:
//!
//! * **Bounded memory:**
//!   the chunk budget is configurable by value count or by in-memory bytes,
//!   and only one chunk buffer is ever live during the split pass.
//! * **Deterministic output:**
//!   values are formatted canonically and exact ties merge in chunk order,
//!   so identical inputs and budgets produce byte-identical results.
//! * **Explicit failures:**
//!   every failure kind (input, chunk write, chunk reopen, output,
//!   malformed record) is a distinct error variant naming the artifact or
//!   record involved; nothing is silently coerced or retried.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use numsort::{BytesLimitedBufferBuilder, ExternalSorter, ExternalSorterBuilder};
//!
//! fn main() {
//!     let sorter: ExternalSorter<BytesLimitedBufferBuilder> = ExternalSorterBuilder::new()
//!         .with_buffer(BytesLimitedBufferBuilder::new(64 * 1024 * 1024))
//!         .build()
//!         .unwrap();
//!
//!     let summary = sorter
//!         .sort_file(Path::new("data.txt"), Path::new("sorted_data.txt"))
//!         .unwrap();
//!
//!     println!("{} values sorted through {} chunks", summary.values, summary.chunks);
//! }
//! ```

pub mod buffer;
pub mod chunk;
pub mod merger;
pub mod sort;
pub mod value;

pub use buffer::{
    BytesLimitedBuffer, BytesLimitedBufferBuilder, ChunkBuffer, ChunkBufferBuilder, CountLimitedBuffer,
    CountLimitedBufferBuilder,
};
pub use chunk::{Chunk, ChunkCursor};
pub use merger::KWayMerger;
pub use sort::{ExternalSorter, ExternalSorterBuilder, SortError, SortSummary};
pub use value::{ParseValueError, Value};
