//! Buffered reading utilities
//!
//! Tile files are read as many small header fields followed by block-sized
//! chunks at scattered offsets. [`BufferedReader`] keeps the small reads cheap
//! and bypasses its buffer for the large ones.

use std::io::{Read, Result, Seek, SeekFrom};
use crate::io::SeekableReader;

/// A buffered reader that wraps any [`SeekableReader`]
pub struct BufferedReader<R: SeekableReader> {
    inner: R,
    buffer: Vec<u8>,
    pos: usize,
    cap: usize,
}

impl<R: SeekableReader> BufferedReader<R> {
    /// Creates a new buffered reader with default buffer size (8KB)
    pub fn new(inner: R) -> Self {
        Self::with_capacity(8192, inner)
    }

    /// Creates a new buffered reader with specified buffer size
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self {
            inner,
            buffer: vec![0; capacity.max(1)],
            pos: 0,
            cap: 0,
        }
    }

    /// Returns the number of bytes currently buffered
    pub fn buffer_len(&self) -> usize {
        self.cap - self.pos
    }

    fn discard_buffer(&mut self) {
        self.pos = 0;
        self.cap = 0;
    }

    fn fill_buffer(&mut self) -> Result<()> {
        self.cap = self.inner.read(&mut self.buffer)?;
        self.pos = 0;
        Ok(())
    }
}

impl<R: SeekableReader> Read for BufferedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pos >= self.cap {
            if buf.len() >= self.buffer.len() {
                return self.inner.read(buf);
            }
            self.fill_buffer()?;
            if self.cap == 0 {
                return Ok(0);
            }
        }

        let available = self.cap - self.pos;
        let to_read = available.min(buf.len());
        buf[..to_read].copy_from_slice(&self.buffer[self.pos..self.pos + to_read]);
        self.pos += to_read;
        Ok(to_read)
    }
}

impl<R: SeekableReader> Seek for BufferedReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        // The inner reader sits `buffer_len()` bytes ahead of the caller.
        let result = match pos {
            SeekFrom::Current(delta) => {
                let ahead = self.buffer_len() as i64;
                self.inner.seek(SeekFrom::Current(delta - ahead))?
            }
            other => self.inner.seek(other)?,
        };
        self.discard_buffer();
        Ok(result)
    }
}
