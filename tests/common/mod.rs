//! Shared test transports.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Hands out `data` at most `per_read` bytes per read, then reports end of
/// stream.
pub struct ChunkReader {
    data: Vec<u8>,
    pos: usize,
    per_read: usize,
}

impl ChunkReader {
    pub fn new(data: impl Into<Vec<u8>>, per_read: usize) -> Self {
        assert!(per_read > 0, "per_read must be positive");
        Self {
            data: data.into(),
            pos: 0,
            per_read,
        }
    }

    /// Bytes never handed out.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }
}

impl AsyncRead for ChunkReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let end = (self.pos + self.per_read)
            .min(self.data.len())
            .min(self.pos + buf.remaining());
        let start = self.pos;
        buf.put_slice(&self.data[start..end]);
        self.pos = end;
        Poll::Ready(Ok(()))
    }
}
