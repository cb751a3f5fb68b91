//! Core I/O traits

use std::io::{Read, Seek, Write};

/// Trait for readers that support both reading and seeking operations
///
/// This trait combines [`Read`] and [`Seek`] to provide a unified interface
/// for file-based I/O operations. It is automatically implemented for any type
/// that implements both traits along with [`Send`] and [`Sync`].
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}

/// A file that is read, overwritten in place and truncated
///
/// Mesh-series files and their rewrite scratch files are both accessed
/// through this trait so that tests can substitute failing streams.
pub trait RecordStream: Read + Write + Seek {
    /// Truncates or extends the underlying storage to `len` bytes
    fn set_len(&mut self, len: u64) -> std::io::Result<()>;
}

impl RecordStream for std::fs::File {
    fn set_len(&mut self, len: u64) -> std::io::Result<()> {
        std::fs::File::set_len(self, len)
    }
}

impl RecordStream for tempfile::NamedTempFile {
    fn set_len(&mut self, len: u64) -> std::io::Result<()> {
        self.as_file().set_len(len)
    }
}

impl RecordStream for std::io::Cursor<Vec<u8>> {
    fn set_len(&mut self, len: u64) -> std::io::Result<()> {
        self.get_mut().resize(len as usize, 0);
        Ok(())
    }
}
