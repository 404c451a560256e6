//! Fixed-capacity numeric buffers with a read/write cursor.
//!
//! A [`DataBuffer`] owns a fixed block of elements and tracks a `position`
//! cursor and a `limit`. `put`/`get` advance the cursor; [`flip`](DataBuffer::flip)
//! switches a freshly filled buffer into reading mode. Serialization uses
//! [`contents`](DataBuffer::contents), which covers the span from the start
//! of the buffer to its limit and never moves the cursor, so encoding a
//! buffer is observably non-mutating.

/// A fixed-capacity buffer of plain values with a cursor.
#[derive(Clone, Debug)]
pub struct DataBuffer<T> {
    data: Vec<T>,
    position: usize,
    limit: usize,
}

impl<T: Copy> DataBuffer<T> {
    /// Wrap a vector; the limit starts at the full length, the cursor at 0.
    pub fn from_vec(data: Vec<T>) -> Self {
        let limit = data.len();
        Self {
            data,
            position: 0,
            limit,
        }
    }

    /// Allocate a zeroed (default-filled) buffer of the given capacity.
    pub fn with_capacity(capacity: usize) -> Self
    where
        T: Default,
    {
        Self::from_vec(vec![T::default(); capacity])
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    pub fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    /// Move the cursor back to the start without touching the limit.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Set the limit to the cursor and rewind; the write-to-read transition.
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    /// Reset the cursor and restore the limit to the full capacity.
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.data.len();
    }

    /// Store a value at the cursor and advance. Returns `false` when the
    /// cursor has reached the limit.
    pub fn put(&mut self, value: T) -> bool {
        if self.position >= self.limit {
            return false;
        }
        self.data[self.position] = value;
        self.position += 1;
        true
    }

    /// Read the value at the cursor and advance.
    pub fn get(&mut self) -> Option<T> {
        if self.position >= self.limit {
            return None;
        }
        let value = self.data[self.position];
        self.position += 1;
        Some(value)
    }

    /// The elements from the start of the buffer to its limit, independent
    /// of the cursor.
    pub fn contents(&self) -> &[T] {
        &self.data[..self.limit]
    }
}

/// Buffers compare by content (start to limit); cursor state does not
/// participate, so two buffers read to different depths still compare equal.
impl<T: Copy + PartialEq> PartialEq for DataBuffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.contents() == other.contents()
    }
}

impl<T: Copy + Eq> Eq for DataBuffer<T> {}

impl<T: Copy> From<Vec<T>> for DataBuffer<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}
