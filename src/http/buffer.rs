use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default starting capacity of a connection's read buffer.
pub const INITIAL_CAPACITY: usize = 4096;

/// Staging area between the transport and the request parser.
///
/// Holds only bytes the parser has not consumed yet. When it is full it at
/// least doubles before the next read; consumed bytes are dropped from the
/// front with [`ReadBuffer::consume`] and their space is reclaimed on growth.
#[derive(Debug)]
pub struct ReadBuffer {
    buf: BytesMut,
    initial_capacity: usize,
    total_read: usize,
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadBuffer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: BytesMut::with_capacity(capacity),
            initial_capacity: capacity,
            total_read: 0,
        }
    }

    pub fn unconsumed(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Bytes read from the transport over the buffer's lifetime.
    pub fn total_read(&self) -> usize {
        self.total_read
    }

    /// Drops `n` bytes from the front.
    ///
    /// # Panics
    ///
    /// If `n` is larger than [`ReadBuffer::len`].
    pub fn consume(&mut self, n: usize) {
        self.buf.advance(n);
    }

    /// Reads whatever the transport has available, growing first if the
    /// buffer is full. Returns 0 at end of stream.
    pub async fn fill_from<R>(&mut self, reader: &mut R) -> std::io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        self.grow_if_full();
        let n = reader.read_buf(&mut self.buf).await?;
        self.total_read += n;
        Ok(n)
    }

    fn grow_if_full(&mut self) {
        if self.buf.len() == self.buf.capacity() {
            let additional = self.buf.capacity().max(self.initial_capacity);
            self.buf.reserve(additional);
        }
    }
}
