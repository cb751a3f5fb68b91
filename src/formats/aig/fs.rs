//! Filesystem access for grid covers

use std::fs::File;
use std::io::{self, Cursor};
use std::path::Path;
use memmap2::Mmap;
use crate::io::{BufferedReader, SeekableReader};

/// Opens the files that make up a grid cover
///
/// Tile files are opened on demand, so the handle keeps its filesystem for
/// its whole lifetime.
pub trait GridFileSystem {
    /// Opens a file for reading
    fn open(&self, path: &Path) -> io::Result<Box<dyn SeekableReader>>;
}

/// The local filesystem, read through a buffer or a memory map
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem {
    pub use_mmap: bool,
}

impl LocalFileSystem {
    pub fn new(use_mmap: bool) -> Self {
        Self { use_mmap }
    }
}

impl GridFileSystem for LocalFileSystem {
    fn open(&self, path: &Path) -> io::Result<Box<dyn SeekableReader>> {
        let file = File::open(path)?;

        if !self.use_mmap {
            return Ok(Box::new(BufferedReader::new(file)));
        }

        let mmap = unsafe { Mmap::map(&file)? };

        // Blocks are fetched in whatever order the caller asks for them.
        #[cfg(unix)]
        if !mmap.is_empty() {
            unsafe {
                libc::madvise(
                    mmap.as_ptr() as *mut libc::c_void,
                    mmap.len(),
                    libc::MADV_RANDOM,
                );
            }
        }

        Ok(Box::new(Cursor::new(mmap)))
    }
}

/// Opens `path`, retrying with the file name upper-cased
///
/// Covers copied from case-insensitive filesystems often carry upper-case
/// names (`W001001.ADF`). The original error is returned when both fail.
pub fn open_with_case_fallback(
    fs: &dyn GridFileSystem,
    path: &Path,
) -> io::Result<Box<dyn SeekableReader>> {
    let first = match fs.open(path) {
        Ok(reader) => return Ok(reader),
        Err(e) => e,
    };

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Err(first);
    };
    let upper = name.to_uppercase();
    if upper == name {
        return Err(first);
    }

    fs.open(&path.with_file_name(upper)).map_err(|_| first)
}
