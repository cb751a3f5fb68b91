//! Lazily populated tile table for grid covers
//!
//! Every tile of a cover has one slot, indexed by `tile_y * tiles_per_row +
//! tile_x`. A slot starts out unattempted, and the first access either opens
//! the tile (with its block index) or records a failure that is never retried.

use std::path::Path;
use crate::error::{Error, Result};
use crate::io::SeekableReader;

/// Byte offsets and sizes of every block stored in one tile file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockIndex {
    pub offsets: Vec<u64>,
    pub sizes: Vec<u32>,
}

impl BlockIndex {
    /// Number of blocks recorded for the tile
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Returns `(offset, size)` for a block, if the index covers it
    pub fn get(&self, block_id: usize) -> Option<(u64, u32)> {
        Some((*self.offsets.get(block_id)?, *self.sizes.get(block_id)?))
    }
}

/// An opened tile: the data file and its block index
pub struct OpenTile {
    pub reader: Box<dyn SeekableReader>,
    pub index: BlockIndex,
}

/// Why a tile could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileFailure {
    /// The tile file does not exist; its blocks read as nodata
    Missing,
    /// The tile file exists but its block index is unusable
    Corrupt(String),
}

/// State of one tile slot
pub enum TileSlot {
    /// No open has been attempted yet
    Unattempted,
    /// An open was attempted and failed
    Failed(TileFailure),
    /// The tile is open and indexed
    Open(OpenTile),
}

impl TileSlot {
    pub fn is_open(&self) -> bool {
        matches!(self, TileSlot::Open(_))
    }
}

/// Owns one slot per tile of a cover
pub struct TileTable {
    slots: Vec<TileSlot>,
    tiles_per_row: usize,
    tiles_per_column: usize,
}

impl TileTable {
    /// Creates a table with every slot unattempted
    pub fn new(tiles_per_row: usize, tiles_per_column: usize) -> Self {
        let count = tiles_per_row * tiles_per_column;
        let mut slots = Vec::with_capacity(count);
        slots.resize_with(count, || TileSlot::Unattempted);

        Self {
            slots,
            tiles_per_row,
            tiles_per_column,
        }
    }

    /// Linear slot index of a tile, rejecting out-of-range coordinates
    pub fn slot_index(&self, tile_x: usize, tile_y: usize) -> Result<usize> {
        if tile_x >= self.tiles_per_row || tile_y >= self.tiles_per_column {
            return Err(Error::out_of_bounds(format!(
                "Tile ({}, {}) outside tile grid {} x {}",
                tile_x, tile_y, self.tiles_per_row, self.tiles_per_column
            )));
        }
        Ok(tile_y * self.tiles_per_row + tile_x)
    }

    pub fn slot(&self, tile_x: usize, tile_y: usize) -> Result<&TileSlot> {
        let index = self.slot_index(tile_x, tile_y)?;
        Ok(&self.slots[index])
    }

    pub fn slot_mut(&mut self, tile_x: usize, tile_y: usize) -> Result<&mut TileSlot> {
        let index = self.slot_index(tile_x, tile_y)?;
        Ok(&mut self.slots[index])
    }

    /// Returns the number of tile slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the number of currently open tiles
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_open()).count()
    }

    /// Closes every open tile and forgets every recorded failure
    pub fn release_all(&mut self) {
        for slot in &mut self.slots {
            *slot = TileSlot::Unattempted;
        }
    }
}

/// Counts failed tile openings for one grid handle
#[derive(Debug, Clone)]
pub struct FailedOpenings {
    count: u32,
    warn_limit: u32,
    give_up_after: Option<u32>,
}

impl FailedOpenings {
    pub fn new(warn_limit: u32, give_up_after: Option<u32>) -> Self {
        Self {
            count: 0,
            warn_limit,
            give_up_after,
        }
    }

    /// Records a failed opening; only the first `warn_limit` are logged
    pub fn record(&mut self, path: &Path) {
        self.count = self.count.saturating_add(1);
        if self.count <= self.warn_limit {
            tracing::warn!(
                path = %path.display(),
                "Failed to open grid file, assuming region is nodata"
            );
        }
    }

    /// Whether further openings should be skipped entirely
    pub fn exhausted(&self) -> bool {
        self.give_up_after.is_some_and(|limit| self.count >= limit)
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_table_starts_unattempted() {
        let table = TileTable::new(3, 2);
        assert_eq!(table.len(), 6);
        assert_eq!(table.open_count(), 0);
        assert!(matches!(table.slot(2, 1).unwrap(), TileSlot::Unattempted));
    }

    #[test]
    fn test_slot_index_row_major() {
        let table = TileTable::new(3, 2);
        assert_eq!(table.slot_index(0, 0).unwrap(), 0);
        assert_eq!(table.slot_index(2, 0).unwrap(), 2);
        assert_eq!(table.slot_index(1, 1).unwrap(), 4);
    }

    #[test]
    fn test_out_of_range_tile() {
        let table = TileTable::new(3, 2);
        assert!(matches!(table.slot(3, 0), Err(Error::OutOfBounds(_))));
        assert!(matches!(table.slot(0, 2), Err(Error::OutOfBounds(_))));
    }

    #[test]
    fn test_release_all() {
        let mut table = TileTable::new(2, 1);
        *table.slot_mut(0, 0).unwrap() = TileSlot::Open(OpenTile {
            reader: Box::new(Cursor::new(vec![0u8; 4])),
            index: BlockIndex::default(),
        });
        *table.slot_mut(1, 0).unwrap() = TileSlot::Failed(TileFailure::Missing);
        assert_eq!(table.open_count(), 1);

        table.release_all();
        assert_eq!(table.open_count(), 0);
        assert!(matches!(table.slot(1, 0).unwrap(), TileSlot::Unattempted));
    }

    #[test]
    fn test_block_index_lookup() {
        let index = BlockIndex {
            offsets: vec![100, 200],
            sizes: vec![10, 20],
        };
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(1), Some((200, 20)));
        assert_eq!(index.get(2), None);
    }

    #[test]
    fn test_failed_openings_give_up() {
        let mut failures = FailedOpenings::new(1, Some(2));
        assert!(!failures.exhausted());
        failures.record(Path::new("a"));
        failures.record(Path::new("b"));
        assert_eq!(failures.count(), 2);
        assert!(failures.exhausted());

        let unlimited = FailedOpenings::new(100, None);
        assert!(!unlimited.exhausted());
    }
}
