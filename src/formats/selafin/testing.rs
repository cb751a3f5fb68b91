//! Scratch stores for exercising the rewrite path in tests

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use crate::io::RecordStream;
use super::rewrite::ScratchStore;

/// Scratch files held in memory
pub struct MemoryScratch;

impl ScratchStore for MemoryScratch {
    fn create(&self) -> io::Result<Box<dyn RecordStream>> {
        Ok(Box::new(Cursor::new(Vec::new())))
    }
}

/// Wraps another store; its files refuse writes past `budget` bytes
pub struct FailingScratch {
    inner: Box<dyn ScratchStore>,
    budget: usize,
    accepted: Arc<AtomicUsize>,
}

impl FailingScratch {
    pub fn wrapping(inner: Box<dyn ScratchStore>, budget: usize) -> Self {
        Self {
            inner,
            budget,
            accepted: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn in_memory(budget: usize) -> Self {
        Self::wrapping(Box::new(MemoryScratch), budget)
    }

    /// Bytes that reached the scratch file before the first refusal
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

struct FailingStream {
    inner: Box<dyn RecordStream>,
    budget: usize,
    accepted: Arc<AtomicUsize>,
}

impl Read for FailingStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for FailingStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.accepted.load(Ordering::SeqCst);
        if written + buf.len() > self.budget {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        let n = self.inner.write(buf)?;
        self.accepted.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FailingStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl RecordStream for FailingStream {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.inner.set_len(len)
    }
}

impl ScratchStore for FailingScratch {
    fn create(&self) -> io::Result<Box<dyn RecordStream>> {
        Ok(Box::new(FailingStream {
            inner: self.inner.create()?,
            budget: self.budget,
            accepted: Arc::clone(&self.accepted),
        }))
    }
}
