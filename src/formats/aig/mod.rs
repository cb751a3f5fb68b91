//! Arc/Info binary grid covers
//!
//! A cover is a directory holding `hdr.adf`, `dblbnd.adf`, `sta.adf` and a
//! sparse set of tiles. Each tile is a pair of files: block data
//! (`w001001.adf`) and its block index (`w001001x.adf`). Tiles are opened the
//! first time one of their blocks is read; missing tiles read as nodata.

pub mod block;
pub mod fs;
pub mod header;
pub mod tiles;

#[cfg(test)]
pub(crate) mod testing;

use std::path::{Path, PathBuf};
use serde::Serialize;
use crate::cache::{FailedOpenings, TileSlot, TileTable};
use crate::config::GridConfig;
use crate::error::{Error, Result};
use crate::types::{CellType, Dimensions, Extent, Statistics, GRID_FLOAT_NO_DATA, GRID_NO_DATA};

pub use fs::{GridFileSystem, LocalFileSystem};
pub use tiles::{tile_basename, TileAccess};

const MAX_TILES: i64 = 1_000_000;

/// Geometry and metadata of an open cover
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridInfo {
    pub cover: PathBuf,
    pub cell_type: CellType,
    pub compressed: bool,
    pub cell_size_x: f64,
    pub cell_size_y: f64,
    pub extent: Extent,
    pub pixels: usize,
    pub lines: usize,
    pub block_x_size: usize,
    pub block_y_size: usize,
    pub blocks_per_row: usize,
    pub blocks_per_column: usize,
    pub tile_x_size: usize,
    pub tile_y_size: usize,
    pub tiles_per_row: usize,
    pub tiles_per_column: usize,
    pub statistics: Option<Statistics>,
}

impl GridInfo {
    /// Number of cells in one block
    pub fn block_cells(&self) -> usize {
        self.block_x_size * self.block_y_size
    }
}

/// Directory of the cover named by `path`, which may be a file inside it
fn cover_directory(path: &Path) -> PathBuf {
    let is_adf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("adf"));
    if !is_adf {
        return path.to_path_buf();
    }

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn invalid_geometry(msg: String) -> Error {
    Error::InvalidGeometry(msg)
}

/// An open grid cover
pub struct AigGrid {
    info: GridInfo,
    tiles: TileTable,
    failures: FailedOpenings,
    fs: Box<dyn GridFileSystem>,
}

impl AigGrid {
    /// Opens a cover on the local filesystem with default settings
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = GridConfig::default();
        let fs = LocalFileSystem::new(config.use_mmap);
        Self::open_with(path, &config, Box::new(fs))
    }

    /// Opens a cover through the given filesystem
    ///
    /// Nothing is retained when any step fails.
    pub fn open_with<P: AsRef<Path>>(
        path: P,
        config: &GridConfig,
        fs: Box<dyn GridFileSystem>,
    ) -> Result<Self> {
        let cover = cover_directory(path.as_ref());
        let header = header::read_header(fs.as_ref(), &cover)?;
        let extent = header::read_bounds(fs.as_ref(), &cover)?;

        if header.cell_size_x <= 0.0 || header.cell_size_y <= 0.0 {
            return Err(invalid_geometry(format!(
                "Illegal cell size : {} x {}",
                header.cell_size_x, header.cell_size_y
            )));
        }

        let pixels = ((extent.width() + 0.5 * header.cell_size_x) / header.cell_size_x) as i64;
        let lines = ((extent.height() + 0.5 * header.cell_size_y) / header.cell_size_y) as i64;
        if pixels <= 0 || lines <= 0 || pixels > i32::MAX as i64 || lines > i32::MAX as i64 {
            return Err(invalid_geometry(format!(
                "Invalid raster dimensions : {} x {}",
                pixels, lines
            )));
        }

        let (bpr, bpc) = (header.blocks_per_row, header.blocks_per_column);
        let (bx, by) = (header.block_x_size, header.block_y_size);
        if bx <= 0 || by <= 0 || bpr <= 0 || bpc <= 0 || bx > i32::MAX / bpr || by > i32::MAX / bpc {
            return Err(invalid_geometry(format!(
                "Invalid block characteristics: nBlockXSize={}, nBlockYSize={}, \
                 nBlocksPerRow={}, nBlocksPerColumn={}",
                bx, by, bpr, bpc
            )));
        }
        if bpr > i32::MAX / bpc {
            return Err(invalid_geometry(format!("Too many blocks: {} x {}", bpr, bpc)));
        }

        let tile_x_size = (bx * bpr) as i64;
        let tile_y_size = (by * bpc) as i64;
        let tiles_per_row = (pixels - 1) / tile_x_size + 1;
        let tiles_per_column = (lines - 1) / tile_y_size + 1;
        if tiles_per_row > MAX_TILES / tiles_per_column {
            return Err(invalid_geometry(format!(
                "Too many tiles: {} x {}",
                tiles_per_row, tiles_per_column
            )));
        }

        let tiles = TileTable::new(tiles_per_row as usize, tiles_per_column as usize);
        let statistics = header::read_statistics(fs.as_ref(), &cover)?;

        let info = GridInfo {
            cover,
            cell_type: header.cell_type,
            compressed: header.compressed,
            cell_size_x: header.cell_size_x,
            cell_size_y: header.cell_size_y,
            extent,
            pixels: pixels as usize,
            lines: lines as usize,
            block_x_size: bx as usize,
            block_y_size: by as usize,
            blocks_per_row: bpr as usize,
            blocks_per_column: bpc as usize,
            tile_x_size: tile_x_size as usize,
            tile_y_size: tile_y_size as usize,
            tiles_per_row: tiles_per_row as usize,
            tiles_per_column: tiles_per_column as usize,
            statistics,
        };

        Ok(Self {
            info,
            tiles,
            failures: FailedOpenings::new(config.warn_failed_openings, config.max_failed_openings),
            fs,
        })
    }

    pub fn info(&self) -> &GridInfo {
        &self.info
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.info.pixels as u64, self.info.lines as u64)
    }

    pub fn extent(&self) -> Extent {
        self.info.extent
    }

    pub fn cell_type(&self) -> CellType {
        self.info.cell_type
    }

    pub fn statistics(&self) -> Option<Statistics> {
        self.info.statistics
    }

    /// Number of tile files that could not be opened so far
    pub fn failed_openings(&self) -> u32 {
        self.failures.count()
    }

    /// Number of tiles currently held open
    pub fn open_tiles(&self) -> usize {
        self.tiles.open_count()
    }

    /// Affine transform: `[origin_x, cell_x, 0, origin_y, 0, -cell_y]`
    pub fn geo_transform(&self) -> [f64; 6] {
        let info = &self.info;
        [
            info.extent.min_x,
            info.cell_size_x,
            0.0,
            info.extent.max_y,
            0.0,
            -info.cell_size_y,
        ]
    }

    /// Reads the raw payload of a block, or `None` when it holds no data
    fn block_payload(&mut self, block_x: usize, block_y: usize) -> Result<Option<Vec<u8>>> {
        let bpr = self.info.blocks_per_row;
        let bpc = self.info.blocks_per_column;
        let (tile_x, tile_y) = (block_x / bpr, block_y / bpc);

        let access = tiles::access_tile(
            &mut self.tiles,
            &mut self.failures,
            self.fs.as_ref(),
            &self.info.cover,
            tile_x,
            tile_y,
        )?;
        if access == TileAccess::Absent {
            return Ok(None);
        }

        let block_id = (block_x % bpr) + (block_y % bpc) * bpr;
        if block_id >= bpr * bpc {
            return Err(Error::out_of_bounds(format!(
                "Block id {} outside tile of {} blocks",
                block_id,
                bpr * bpc
            )));
        }

        let TileSlot::Open(tile) = self.tiles.slot_mut(tile_x, tile_y)? else {
            return Ok(None);
        };
        let Some((offset, size)) = tile.index.get(block_id) else {
            tracing::debug!(
                block_id,
                blocks = tile.index.len(),
                "Requested legal block beyond end of block map, assuming nodata"
            );
            return Ok(None);
        };

        block::read_block_payload(tile.reader.as_mut(), offset, size).map(Some)
    }

    fn check_buffer(&self, len: usize) -> Result<()> {
        if len != self.info.block_cells() {
            return Err(Error::out_of_bounds(format!(
                "Buffer of {} cells for a block of {}",
                len,
                self.info.block_cells()
            )));
        }
        Ok(())
    }

    /// Reads one block into `out` as integers
    pub fn read_block_i32_into(&mut self, block_x: usize, block_y: usize, out: &mut [i32]) -> Result<()> {
        self.check_buffer(out.len())?;
        match self.block_payload(block_x, block_y)? {
            Some(payload) => block::decode_i32(&payload, self.info.cell_type, self.info.compressed, out),
            None => {
                out.fill(GRID_NO_DATA);
                Ok(())
            }
        }
    }

    /// Reads one block into `out` as floats
    pub fn read_block_f32_into(&mut self, block_x: usize, block_y: usize, out: &mut [f32]) -> Result<()> {
        self.check_buffer(out.len())?;
        match self.block_payload(block_x, block_y)? {
            Some(payload) => block::decode_f32(&payload, self.info.cell_type, self.info.compressed, out),
            None => {
                out.fill(GRID_FLOAT_NO_DATA);
                Ok(())
            }
        }
    }

    pub fn read_block_i32(&mut self, block_x: usize, block_y: usize) -> Result<Vec<i32>> {
        let mut out = vec![0i32; self.info.block_cells()];
        self.read_block_i32_into(block_x, block_y, &mut out)?;
        Ok(out)
    }

    pub fn read_block_f32(&mut self, block_x: usize, block_y: usize) -> Result<Vec<f32>> {
        let mut out = vec![0f32; self.info.block_cells()];
        self.read_block_f32_into(block_x, block_y, &mut out)?;
        Ok(out)
    }

    /// Value of one cell in its native type, `None` for nodata
    pub fn cell_value(&mut self, pixel: usize, line: usize) -> Result<Option<f64>> {
        if pixel >= self.info.pixels || line >= self.info.lines {
            return Err(Error::out_of_bounds(format!(
                "Cell ({}, {}) outside raster {} x {}",
                pixel, line, self.info.pixels, self.info.lines
            )));
        }

        let (bx, by) = (self.info.block_x_size, self.info.block_y_size);
        let cell = (line % by) * bx + pixel % bx;

        match self.info.cell_type {
            CellType::Int => {
                let block = self.read_block_i32(pixel / bx, line / by)?;
                Ok(Some(block[cell]).filter(|&v| v != GRID_NO_DATA).map(f64::from))
            }
            CellType::Float => {
                let block = self.read_block_f32(pixel / bx, line / by)?;
                Ok(Some(block[cell]).filter(|&v| v != GRID_FLOAT_NO_DATA).map(f64::from))
            }
        }
    }

    /// Releases every open tile
    pub fn close(mut self) {
        self.tiles.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::{CoverBuilder, MemoryFileSystem};

    fn open_memory(fs: &MemoryFileSystem) -> Result<AigGrid> {
        AigGrid::open_with("cover/hdr.adf", &GridConfig::default(), Box::new(fs.clone()))
    }

    #[test]
    fn test_cover_directory() {
        assert_eq!(cover_directory(Path::new("a/b/hdr.adf")), PathBuf::from("a/b"));
        assert_eq!(cover_directory(Path::new("a/b/W001001.ADF")), PathBuf::from("a/b"));
        assert_eq!(cover_directory(Path::new("hdr.adf")), PathBuf::from("."));
        assert_eq!(cover_directory(Path::new("a/b")), PathBuf::from("a/b"));
    }

    #[test]
    fn test_pixel_count_rounds_down() {
        let fs = MemoryFileSystem::new();
        CoverBuilder::int(4, 4).extent(0.0, 0.0, 100.3, 10.0).write(&fs, "cover");

        let grid = open_memory(&fs).unwrap();
        assert_eq!(grid.dimensions(), Dimensions::new(100, 10));
        assert_eq!(grid.info().tiles_per_row, 25);
        assert_eq!(grid.info().tiles_per_column, 3);
    }

    #[test]
    fn test_absent_tile_reads_nodata() {
        let fs = MemoryFileSystem::new();
        CoverBuilder::int(4, 4).extent(0.0, 0.0, 8.0, 8.0).write(&fs, "cover");

        let mut grid = open_memory(&fs).unwrap();
        assert_eq!(grid.read_block_i32(1, 1).unwrap(), vec![GRID_NO_DATA; 16]);
        assert_eq!(grid.read_block_f32(1, 1).unwrap(), vec![GRID_FLOAT_NO_DATA; 16]);
        assert_eq!(grid.failed_openings(), 1);
        assert_eq!(grid.cell_value(5, 5).unwrap(), None);
    }

    #[test]
    fn test_absent_tile_opened_once() {
        let fs = MemoryFileSystem::new();
        CoverBuilder::int(4, 4).extent(0.0, 0.0, 8.0, 8.0).write(&fs, "cover");

        let mut grid = open_memory(&fs).unwrap();
        for _ in 0..5 {
            grid.read_block_i32(0, 0).unwrap();
        }
        assert_eq!(fs.open_count(Path::new("cover/w001001.adf")), 1);
    }

    #[test]
    fn test_reads_compressed_block() {
        let fs = MemoryFileSystem::new();
        let block = vec![0x08, 0x01, 0x05, 0, 1, 2, 3];
        CoverBuilder::int(2, 2)
            .extent(0.0, 0.0, 2.0, 2.0)
            .tile("w001001", vec![block])
            .write(&fs, "cover");

        let mut grid = open_memory(&fs).unwrap();
        assert_eq!(grid.read_block_i32(0, 0).unwrap(), vec![5, 6, 7, 8]);
        assert_eq!(grid.read_block_f32(0, 0).unwrap(), vec![5.0, 6.0, 7.0, 8.0]);
        assert_eq!(grid.cell_value(1, 1).unwrap(), Some(8.0));
        assert_eq!(grid.open_tiles(), 1);
    }

    #[test]
    fn test_block_beyond_index_is_nodata() {
        let fs = MemoryFileSystem::new();
        let block: Vec<u8> = [1.5f32; 4].iter().flat_map(|v| v.to_be_bytes()).collect();
        CoverBuilder::float(2, 2)
            .blocks_per_tile(2, 1)
            .extent(0.0, 0.0, 4.0, 2.0)
            .tile("w001001", vec![block])
            .write(&fs, "cover");

        let mut grid = open_memory(&fs).unwrap();
        assert_eq!(grid.read_block_f32(0, 0).unwrap(), vec![1.5; 4]);
        assert_eq!(grid.read_block_i32(0, 0).unwrap(), vec![1; 4]);
        assert_eq!(grid.read_block_f32(1, 0).unwrap(), vec![GRID_FLOAT_NO_DATA; 4]);
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let fs = MemoryFileSystem::new();
        CoverBuilder::int(4, 4).cell_size(0.0).write(&fs, "cover");
        assert!(matches!(open_memory(&fs), Err(Error::InvalidGeometry(_))));

        let fs = MemoryFileSystem::new();
        CoverBuilder::int(0, 4).write(&fs, "cover");
        assert!(matches!(open_memory(&fs), Err(Error::InvalidGeometry(_))));

        let fs = MemoryFileSystem::new();
        CoverBuilder::int(4, 4).extent(0.0, 0.0, 0.0, 10.0).write(&fs, "cover");
        assert!(matches!(open_memory(&fs), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_rejects_too_many_tiles() {
        let fs = MemoryFileSystem::new();
        CoverBuilder::int(1, 1)
            .blocks_per_tile(1, 1)
            .extent(0.0, 0.0, 1001.0, 1000.0)
            .write(&fs, "cover");
        assert!(matches!(open_memory(&fs), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_geo_transform() {
        let fs = MemoryFileSystem::new();
        CoverBuilder::int(4, 4).cell_size(2.0).extent(10.0, 20.0, 30.0, 40.0).write(&fs, "cover");
        let grid = open_memory(&fs).unwrap();
        assert_eq!(grid.geo_transform(), [10.0, 2.0, 0.0, 40.0, 0.0, -2.0]);
    }

    #[test]
    fn test_open_local_cover() {
        let dir = tempfile::tempdir().unwrap();
        let block = vec![0x00, 0x01, 0x09];
        CoverBuilder::int(2, 2)
            .extent(0.0, 0.0, 2.0, 2.0)
            .tile("w001001", vec![block])
            .write_dir(dir.path());

        for use_mmap in [false, true] {
            let config = GridConfig { use_mmap, ..GridConfig::default() };
            let mut grid = AigGrid::open_with(
                dir.path().join("hdr.adf"),
                &config,
                Box::new(LocalFileSystem::new(use_mmap)),
            )
            .unwrap();
            assert_eq!(grid.read_block_i32(0, 0).unwrap(), vec![9; 4]);
            assert!(grid.statistics().is_some());
            grid.close();
        }
    }
}
