//! Bounded chunk buffers.

use std::mem;

use crate::value::Value;

/// Buffer builder.
pub trait ChunkBufferBuilder: Default {
    type Buffer: ChunkBuffer;

    /// Creates a new empty buffer.
    fn build(&self) -> Self::Buffer;
}

/// Bounded buffer the split phase fills before flushing a chunk.
///
/// The buffer is exclusively owned by the split loop for the duration of
/// one chunk and is consumed when the chunk is persisted.
pub trait ChunkBuffer: IntoIterator<Item = Value> {
    /// Adds a value to the buffer.
    fn push(&mut self, value: Value);

    /// Returns the number of buffered values.
    fn len(&self) -> usize;

    /// Checks if the buffer reached its budget.
    fn is_full(&self) -> bool;

    /// Exposes the buffered values for in-place sorting.
    fn as_mut_slice(&mut self) -> &mut [Value];
}

#[derive(Clone)]
pub struct CountLimitedBufferBuilder {
    buffer_limit: usize,
    preallocate: bool,
}

impl CountLimitedBufferBuilder {
    pub fn new(buffer_limit: usize, preallocate: bool) -> Self {
        CountLimitedBufferBuilder {
            buffer_limit,
            preallocate,
        }
    }
}

impl ChunkBufferBuilder for CountLimitedBufferBuilder {
    type Buffer = CountLimitedBuffer;

    fn build(&self) -> Self::Buffer {
        if self.preallocate {
            CountLimitedBuffer::with_capacity(self.buffer_limit)
        } else {
            CountLimitedBuffer::new(self.buffer_limit)
        }
    }
}

impl Default for CountLimitedBufferBuilder {
    fn default() -> Self {
        CountLimitedBufferBuilder {
            buffer_limit: usize::MAX,
            preallocate: false,
        }
    }
}

/// Buffer limited by value count.
pub struct CountLimitedBuffer {
    limit: usize,
    inner: Vec<Value>,
}

impl CountLimitedBuffer {
    pub fn new(limit: usize) -> Self {
        CountLimitedBuffer {
            limit,
            inner: Vec::new(),
        }
    }

    pub fn with_capacity(limit: usize) -> Self {
        CountLimitedBuffer {
            limit,
            inner: Vec::with_capacity(limit),
        }
    }
}

impl ChunkBuffer for CountLimitedBuffer {
    fn push(&mut self, value: Value) {
        self.inner.push(value);
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn is_full(&self) -> bool {
        self.inner.len() >= self.limit
    }

    fn as_mut_slice(&mut self) -> &mut [Value] {
        self.inner.as_mut_slice()
    }
}

impl IntoIterator for CountLimitedBuffer {
    type Item = Value;
    type IntoIter = <Vec<Value> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

#[derive(Clone)]
pub struct BytesLimitedBufferBuilder {
    buffer_limit: u64,
}

impl BytesLimitedBufferBuilder {
    pub fn new(buffer_limit: u64) -> Self {
        BytesLimitedBufferBuilder { buffer_limit }
    }
}

impl ChunkBufferBuilder for BytesLimitedBufferBuilder {
    type Buffer = BytesLimitedBuffer;

    fn build(&self) -> Self::Buffer {
        BytesLimitedBuffer::new(self.buffer_limit)
    }
}

impl Default for BytesLimitedBufferBuilder {
    fn default() -> Self {
        BytesLimitedBufferBuilder { buffer_limit: u64::MAX }
    }
}

/// Buffer limited by in-memory size.
/// Values are fixed-width, so the size is the element count scaled.
pub struct BytesLimitedBuffer {
    limit: u64,
    inner: Vec<Value>,
}

impl BytesLimitedBuffer {
    pub fn new(limit: u64) -> Self {
        BytesLimitedBuffer {
            limit,
            inner: Vec::new(),
        }
    }

    /// Current in-memory size of the buffered values.
    pub fn mem_size(&self) -> u64 {
        (self.inner.len() * mem::size_of::<Value>()) as u64
    }
}

impl ChunkBuffer for BytesLimitedBuffer {
    fn push(&mut self, value: Value) {
        self.inner.push(value);
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn is_full(&self) -> bool {
        self.mem_size() >= self.limit
    }

    fn as_mut_slice(&mut self) -> &mut [Value] {
        self.inner.as_mut_slice()
    }
}

impl IntoIterator for BytesLimitedBuffer {
    type Item = Value;
    type IntoIter = <Vec<Value> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}
