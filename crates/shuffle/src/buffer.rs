use crate::pool::PoolShared;
use std::fmt;
use std::sync::Arc;

/// Whether a buffer carries serialized records or a serialized event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Serialized records produced by the writer.
    Data,
    /// A serialized (non-priority) control event.
    Event,
}

/// Handle to one leased pool segment.
///
/// A buffer is owned by exactly one party at a time — the writer, a
/// subpartition queue, or the in-flight transport — and the handle is not
/// `Clone`. Dropping the handle recycles the segment into its pool exactly
/// once, so a double free or a leak is not expressible in safe code.
pub struct Buffer {
    /// Taken in `drop`; `None` only during teardown.
    segment: Option<Box<[u8]>>,
    len: usize,
    kind: BufferKind,
    pool: Arc<PoolShared>,
}

impl Buffer {
    pub(crate) fn lease(segment: Box<[u8]>, pool: Arc<PoolShared>) -> Self {
        Self {
            segment: Some(segment),
            len: 0,
            kind: BufferKind::Data,
            pool,
        }
    }

    fn segment(&self) -> &[u8] {
        self.segment.as_deref().unwrap_or(&[])
    }

    fn segment_mut(&mut self) -> &mut [u8] {
        self.segment.as_deref_mut().unwrap_or(&mut [])
    }

    /// Returns the fixed segment size in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.segment().len()
    }

    /// Returns the number of payload bytes written.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no payload bytes have been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sets the payload length after writing through `as_mut_slice`.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the segment capacity.
    pub fn set_len(&mut self, len: usize) {
        assert!(
            len <= self.capacity(),
            "payload length {} exceeds segment capacity {}",
            len,
            self.capacity()
        );
        self.len = len;
    }

    /// Returns the whole writable segment. Pair with `set_len`.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.segment_mut()
    }

    /// Copies `src` into the segment, truncating to capacity.
    ///
    /// Sets the payload length and returns the number of bytes copied.
    pub fn fill_from(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.capacity());
        self.segment_mut()[..n].copy_from_slice(&src[..n]);
        self.len = n;
        n
    }

    /// Returns the written payload bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.segment()[..self.len]
    }

    /// Returns the data-vs-event tag.
    #[inline]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Tags the buffer, e.g. before appending a serialized event.
    pub fn set_kind(&mut self, kind: BufferKind) {
        self.kind = kind;
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(segment) = self.segment.take() {
            self.pool.recycle(segment);
        }
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.data() == other.data()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("kind", &self.kind)
            .finish()
    }
}
