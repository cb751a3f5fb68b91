//! Tile locator: names tile files and opens them on first use

use std::path::Path;
use crate::cache::{FailedOpenings, OpenTile, TileFailure, TileSlot, TileTable};
use crate::error::{Error, Result};
use super::block::read_block_index;
use super::fs::{open_with_case_fallback, GridFileSystem};

/// Outcome of asking for a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileAccess {
    /// The tile is open and its slot holds the reader and block index
    Open,
    /// The tile does not exist; its blocks read as nodata
    Absent,
}

/// Base file name (without extension) of a tile
///
/// The first two tile rows use the `w` prefix with a row code of `001` and
/// `000`; later rows use `z` with `tile_y - 1`.
pub fn tile_basename(tile_x: usize, tile_y: usize) -> String {
    match tile_y {
        0 => format!("w{:03}001", tile_x + 1),
        1 => format!("w{:03}000", tile_x + 1),
        _ => format!("z{:03}{:03}", tile_x + 1, tile_y - 1),
    }
}

/// Makes sure the tile at `(tile_x, tile_y)` has been tried
///
/// The filesystem is touched at most once per tile. Missing tiles are
/// remembered as absent; a tile whose block index cannot be read is
/// remembered as corrupt and reported as an error on every access.
pub fn access_tile(
    table: &mut TileTable,
    failures: &mut FailedOpenings,
    fs: &dyn GridFileSystem,
    cover_dir: &Path,
    tile_x: usize,
    tile_y: usize,
) -> Result<TileAccess> {
    let slot = table.slot_mut(tile_x, tile_y)?;

    match &*slot {
        TileSlot::Open(_) => return Ok(TileAccess::Open),
        TileSlot::Failed(TileFailure::Missing) => return Ok(TileAccess::Absent),
        TileSlot::Failed(TileFailure::Corrupt(reason)) => {
            return Err(Error::invalid_format(reason.clone()))
        }
        TileSlot::Unattempted => {}
    }

    if failures.exhausted() {
        *slot = TileSlot::Failed(TileFailure::Missing);
        return Ok(TileAccess::Absent);
    }

    let basename = tile_basename(tile_x, tile_y);
    let data_path = cover_dir.join(format!("{}.adf", basename));
    let reader = match open_with_case_fallback(fs, &data_path) {
        Ok(reader) => reader,
        Err(_) => {
            failures.record(&data_path);
            *slot = TileSlot::Failed(TileFailure::Missing);
            return Ok(TileAccess::Absent);
        }
    };

    let index_path = cover_dir.join(format!("{}x.adf", basename));
    let index = open_with_case_fallback(fs, &index_path)
        .map_err(Error::from)
        .and_then(|mut index_reader| read_block_index(index_reader.as_mut()));

    match index {
        Ok(index) => {
            tracing::debug!(tile_x, tile_y, blocks = index.len(), "Opened grid tile");
            *slot = TileSlot::Open(OpenTile { reader, index });
            Ok(TileAccess::Open)
        }
        Err(e) => {
            let reason = format!("Block index {}: {}", index_path.display(), e);
            *slot = TileSlot::Failed(TileFailure::Corrupt(reason.clone()));
            Err(Error::invalid_format(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::aig::testing::{index_bytes, MemoryFileSystem};

    #[test]
    fn test_tile_basenames() {
        assert_eq!(tile_basename(0, 0), "w001001");
        assert_eq!(tile_basename(0, 1), "w001000");
        assert_eq!(tile_basename(2, 5), "z003004");
        assert_eq!(tile_basename(998, 2), "z999001");
    }

    #[test]
    fn test_missing_tile_tried_once() {
        let fs = MemoryFileSystem::new();
        let mut table = TileTable::new(1, 1);
        let mut failures = FailedOpenings::new(100, None);
        let dir = Path::new("cover");

        for _ in 0..3 {
            let access = access_tile(&mut table, &mut failures, &fs, dir, 0, 0).unwrap();
            assert_eq!(access, TileAccess::Absent);
        }
        assert_eq!(fs.open_count(&dir.join("w001001.adf")), 1);
        assert_eq!(failures.count(), 1);
    }

    #[test]
    fn test_corrupt_index_is_sticky() {
        let fs = MemoryFileSystem::new();
        fs.insert("cover/w001001.adf", vec![0u8; 100]);
        fs.insert("cover/w001001x.adf", vec![0u8; 100]);

        let mut table = TileTable::new(1, 1);
        let mut failures = FailedOpenings::new(100, None);
        let dir = Path::new("cover");

        assert!(access_tile(&mut table, &mut failures, &fs, dir, 0, 0).is_err());
        assert!(access_tile(&mut table, &mut failures, &fs, dir, 0, 0).is_err());
        assert_eq!(fs.open_count(&dir.join("w001001x.adf")), 1);
    }

    #[test]
    fn test_opens_upper_case_tile() {
        let fs = MemoryFileSystem::new();
        fs.insert("cover/W001000.ADF", vec![0u8; 100]);
        fs.insert("cover/W001000X.ADF", index_bytes(&[]));

        let mut table = TileTable::new(1, 2);
        let mut failures = FailedOpenings::new(100, None);
        let access = access_tile(&mut table, &mut failures, &fs, Path::new("cover"), 0, 1).unwrap();
        assert_eq!(access, TileAccess::Open);
        assert_eq!(table.open_count(), 1);
    }

    #[test]
    fn test_gives_up_after_limit() {
        let fs = MemoryFileSystem::new();
        let mut table = TileTable::new(3, 1);
        let mut failures = FailedOpenings::new(100, Some(1));
        let dir = Path::new("cover");

        access_tile(&mut table, &mut failures, &fs, dir, 0, 0).unwrap();
        access_tile(&mut table, &mut failures, &fs, dir, 1, 0).unwrap();
        assert_eq!(fs.open_count(&dir.join("w002001.adf")), 0);
    }

    #[test]
    fn test_out_of_range_tile() {
        let fs = MemoryFileSystem::new();
        let mut table = TileTable::new(1, 1);
        let mut failures = FailedOpenings::new(100, None);
        assert!(matches!(
            access_tile(&mut table, &mut failures, &fs, Path::new("cover"), 1, 0),
            Err(Error::OutOfBounds(_))
        ));
    }
}
