//! Cover fixtures and an in-memory filesystem for tests

use std::collections::HashMap;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use crate::io::SeekableReader;
use crate::types::CellType;
use super::fs::GridFileSystem;

/// In-memory files with a per-path counter of open attempts
#[derive(Clone, Default)]
pub struct MemoryFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    opens: Arc<Mutex<HashMap<PathBuf, usize>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl AsRef<Path>, bytes: Vec<u8>) {
        self.files.lock().unwrap().insert(path.as_ref().to_path_buf(), bytes);
    }

    pub fn open_count(&self, path: &Path) -> usize {
        self.opens.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

impl GridFileSystem for MemoryFileSystem {
    fn open(&self, path: &Path) -> io::Result<Box<dyn SeekableReader>> {
        *self.opens.lock().unwrap().entry(path.to_path_buf()).or_insert(0) += 1;
        match self.files.lock().unwrap().get(path) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(io::Error::new(io::ErrorKind::NotFound, path.display().to_string())),
        }
    }
}

pub fn header_bytes(
    cell_type: CellType,
    compressed: bool,
    cell_size: (f64, f64),
    blocks_per_tile: (i32, i32),
    block_size: (i32, i32),
) -> Vec<u8> {
    let mut bytes = vec![0u8; 308];
    let code: i32 = match cell_type {
        CellType::Int => 1,
        CellType::Float => 2,
    };
    bytes[16..20].copy_from_slice(&code.to_be_bytes());
    bytes[20..24].copy_from_slice(&(if compressed { 0i32 } else { 1 }).to_be_bytes());
    bytes[256..264].copy_from_slice(&cell_size.0.to_be_bytes());
    bytes[264..272].copy_from_slice(&cell_size.1.to_be_bytes());
    bytes[288..292].copy_from_slice(&blocks_per_tile.0.to_be_bytes());
    bytes[292..296].copy_from_slice(&blocks_per_tile.1.to_be_bytes());
    bytes[296..300].copy_from_slice(&block_size.0.to_be_bytes());
    bytes[304..308].copy_from_slice(&block_size.1.to_be_bytes());
    bytes
}

pub fn bounds_bytes(a: f64, b: f64, c: f64, d: f64) -> Vec<u8> {
    [a, b, c, d].iter().flat_map(|v| v.to_be_bytes()).collect()
}

fn file_header(length_words: i32) -> Vec<u8> {
    let mut bytes = vec![0u8; 100];
    bytes[..4].copy_from_slice(&[0x00, 0x00, 0x27, 0x0A]);
    bytes[24..28].copy_from_slice(&length_words.to_be_bytes());
    bytes
}

/// Block index file for `(offset, size)` entries given in 16-bit words
pub fn index_bytes(entries: &[(i32, i32)]) -> Vec<u8> {
    let mut bytes = file_header((100 + 8 * entries.len() as i32) / 2);
    for (offset, size) in entries {
        bytes.extend_from_slice(&offset.to_be_bytes());
        bytes.extend_from_slice(&size.to_be_bytes());
    }
    bytes
}

/// Tile data file holding `blocks`, plus their index entries in words
pub fn tile_bytes(blocks: &[Vec<u8>]) -> (Vec<u8>, Vec<(i32, i32)>) {
    let mut bytes = file_header(0);
    let mut entries = Vec::new();
    for block in blocks {
        let mut payload = block.clone();
        if payload.len() % 2 == 1 {
            payload.push(0);
        }
        let words = (payload.len() / 2) as i32;
        entries.push(((bytes.len() / 2) as i32, words));
        bytes.extend_from_slice(&(words as u16).to_be_bytes());
        bytes.extend_from_slice(&payload);
    }
    let length_words = (bytes.len() / 2) as i32;
    bytes[24..28].copy_from_slice(&length_words.to_be_bytes());
    (bytes, entries)
}

/// Builds the files of a small cover
pub struct CoverBuilder {
    cell_type: CellType,
    compressed: bool,
    cell_size: f64,
    block_size: (i32, i32),
    blocks_per_tile: (i32, i32),
    extent: [f64; 4],
    tiles: Vec<(String, Vec<Vec<u8>>)>,
}

impl CoverBuilder {
    /// Compressed integer cover
    pub fn int(block_x: i32, block_y: i32) -> Self {
        Self {
            cell_type: CellType::Int,
            compressed: true,
            cell_size: 1.0,
            block_size: (block_x, block_y),
            blocks_per_tile: (1, 1),
            extent: [0.0, 0.0, 10.0, 10.0],
            tiles: Vec::new(),
        }
    }

    /// Uncompressed float cover
    pub fn float(block_x: i32, block_y: i32) -> Self {
        Self {
            cell_type: CellType::Float,
            compressed: false,
            ..Self::int(block_x, block_y)
        }
    }

    pub fn cell_size(mut self, size: f64) -> Self {
        self.cell_size = size;
        self
    }

    pub fn blocks_per_tile(mut self, per_row: i32, per_column: i32) -> Self {
        self.blocks_per_tile = (per_row, per_column);
        self
    }

    pub fn extent(mut self, llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        self.extent = [llx, lly, urx, ury];
        self
    }

    pub fn tile(mut self, basename: &str, blocks: Vec<Vec<u8>>) -> Self {
        self.tiles.push((basename.to_string(), blocks));
        self
    }

    fn files(&self) -> Vec<(String, Vec<u8>)> {
        let [llx, lly, urx, ury] = self.extent;
        let mut files = vec![
            (
                "hdr.adf".to_string(),
                header_bytes(
                    self.cell_type,
                    self.compressed,
                    (self.cell_size, self.cell_size),
                    self.blocks_per_tile,
                    self.block_size,
                ),
            ),
            ("dblbnd.adf".to_string(), bounds_bytes(llx, lly, urx, ury)),
            ("sta.adf".to_string(), bounds_bytes(0.0, 1.0, 0.5, 0.1)),
        ];
        for (basename, blocks) in &self.tiles {
            let (data, entries) = tile_bytes(blocks);
            files.push((format!("{}.adf", basename), data));
            files.push((format!("{}x.adf", basename), index_bytes(&entries)));
        }
        files
    }

    pub fn write(&self, fs: &MemoryFileSystem, dir: &str) {
        for (name, bytes) in self.files() {
            fs.insert(Path::new(dir).join(name), bytes);
        }
    }

    pub fn write_dir(&self, dir: &Path) {
        for (name, bytes) in self.files() {
            std::fs::write(dir.join(name), bytes).unwrap();
        }
    }
}
