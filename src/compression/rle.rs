//! Run-length block decoding
//!
//! Three run-length families are used by integer grid blocks:
//! - value runs: `[count][value]`, the value stored in 1, 2 or 4 bytes
//! - minimum runs: a marker below 128 repeats the block minimum, otherwise
//!   `256 - marker` nodata cells follow
//! - literal runs: a marker below 128 is followed by that many literal
//!   values, otherwise `256 - marker` nodata cells follow

use crate::error::{Error, Result};
use crate::types::GRID_NO_DATA;

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn byte(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or_else(truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    fn value(&mut self, width: usize) -> Result<i32> {
        let bytes = self.data.get(self.pos..self.pos + width).ok_or_else(truncated)?;
        self.pos += width;
        Ok(match width {
            1 => bytes[0] as i32,
            2 => u16::from_be_bytes([bytes[0], bytes[1]]) as i32,
            _ => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        })
    }
}

fn truncated() -> Error {
    Error::invalid_format("Run-length block ends before all cells are decoded")
}

fn check_run(filled: usize, run: usize, total: usize) -> Result<()> {
    if filled + run > total {
        return Err(Error::invalid_format(format!(
            "Run of {} cells overflows block of {} cells at cell {}",
            run, total, filled
        )));
    }
    Ok(())
}

/// Decodes `[count][value]` runs with values of `width` bytes
pub fn value_runs(data: &[u8], width: usize, min: i32, out: &mut [i32]) -> Result<()> {
    let mut cursor = Cursor::new(data);
    let mut filled = 0;

    while filled < out.len() {
        let count = cursor.byte()? as usize;
        let value = cursor.value(width)?.wrapping_add(min);
        check_run(filled, count, out.len())?;
        out[filled..filled + count].fill(value);
        filled += count;
    }

    Ok(())
}

/// Decodes runs of the block minimum interleaved with nodata runs
pub fn min_runs(data: &[u8], min: i32, out: &mut [i32]) -> Result<()> {
    let mut cursor = Cursor::new(data);
    let mut filled = 0;

    while filled < out.len() {
        let marker = cursor.byte()?;
        let (count, value) = if marker < 128 {
            (marker as usize, min)
        } else {
            (256 - marker as usize, GRID_NO_DATA)
        };
        check_run(filled, count, out.len())?;
        out[filled..filled + count].fill(value);
        filled += count;
    }

    Ok(())
}

/// Decodes literal runs of `width`-byte values interleaved with nodata runs
pub fn literal_runs(data: &[u8], width: usize, min: i32, out: &mut [i32]) -> Result<()> {
    let mut cursor = Cursor::new(data);
    let mut filled = 0;

    while filled < out.len() {
        let marker = cursor.byte()?;
        if marker < 128 {
            let count = marker as usize;
            check_run(filled, count, out.len())?;
            for cell in &mut out[filled..filled + count] {
                *cell = cursor.value(width)?.wrapping_add(min);
            }
            filled += count;
        } else {
            let count = 256 - marker as usize;
            check_run(filled, count, out.len())?;
            out[filled..filled + count].fill(GRID_NO_DATA);
            filled += count;
        }
    }

    Ok(())
}
