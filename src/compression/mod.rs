//! Grid block encodings
//!
//! Compressed integer blocks start with an encoding tag, the byte width of
//! the block minimum and the minimum itself; the remaining bytes are
//! interpreted according to the tag.

pub mod raw;
pub mod rle;

use crate::error::{Error, Result};

/// Encodings found in compressed integer blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEncoding {
    /// Every cell equals the block minimum
    Constant,
    /// Bit-packed values of the given width
    Raw(u32),
    /// `[count][value]` runs with values of the given byte width
    ValueRuns(usize),
    /// Runs of the block minimum or nodata
    MinRuns,
    /// Literal runs with values of the given byte width, or nodata runs
    LiteralRuns(usize),
    /// CCITT fax encoded 1-bit data
    Ccitt,
}

impl BlockEncoding {
    /// Creates an encoding from the block tag byte
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0x00 => Ok(BlockEncoding::Constant),
            0x01 => Ok(BlockEncoding::Raw(1)),
            0x04 => Ok(BlockEncoding::Raw(4)),
            0x08 => Ok(BlockEncoding::Raw(8)),
            0x10 => Ok(BlockEncoding::Raw(16)),
            0x20 => Ok(BlockEncoding::Raw(32)),
            0xFC | 0xF8 => Ok(BlockEncoding::ValueRuns(1)),
            0xF0 => Ok(BlockEncoding::ValueRuns(2)),
            0xE0 => Ok(BlockEncoding::ValueRuns(4)),
            0xDF => Ok(BlockEncoding::MinRuns),
            0xD7 => Ok(BlockEncoding::LiteralRuns(1)),
            0xCF => Ok(BlockEncoding::LiteralRuns(2)),
            0xFF => Ok(BlockEncoding::Ccitt),
            _ => Err(Error::unsupported(format!("Grid block encoding 0x{:02X}", tag))),
        }
    }

    /// Returns the name of this encoding
    pub fn name(&self) -> &'static str {
        match self {
            BlockEncoding::Constant => "Constant",
            BlockEncoding::Raw(_) => "Raw",
            BlockEncoding::ValueRuns(_) => "RLE",
            BlockEncoding::MinRuns => "RLE-Min",
            BlockEncoding::LiteralRuns(_) => "RLE-Literal",
            BlockEncoding::Ccitt => "CCITT",
        }
    }

    /// Decodes `data` into `out`, offsetting every value by `min`
    pub fn decode(&self, data: &[u8], min: i32, out: &mut [i32]) -> Result<()> {
        match *self {
            BlockEncoding::Constant => {
                raw::constant(min, out);
                Ok(())
            }
            BlockEncoding::Raw(bits) => raw::unpack(data, bits, min, out),
            BlockEncoding::ValueRuns(width) => rle::value_runs(data, width, min, out),
            BlockEncoding::MinRuns => rle::min_runs(data, min, out),
            BlockEncoding::LiteralRuns(width) => rle::literal_runs(data, width, min, out),
            BlockEncoding::Ccitt => Err(Error::unsupported(format!(
                "{} encoded grid blocks",
                self.name()
            ))),
        }
    }
}

/// Decodes a compressed integer block payload (without its size prefix)
pub fn decode_compressed(payload: &[u8], out: &mut [i32]) -> Result<()> {
    if payload.len() < 2 {
        return Err(Error::invalid_format("Compressed block shorter than its header"));
    }

    let encoding = BlockEncoding::from_tag(payload[0])?;
    let min_size = payload[1] as usize;
    if min_size > 4 {
        return Err(Error::invalid_format(format!(
            "Corrupt minimum size of {} in block header",
            min_size
        )));
    }

    let min_bytes = payload
        .get(2..2 + min_size)
        .ok_or_else(|| Error::invalid_format("Block header truncated in minimum value"))?;
    let min = block_minimum(min_bytes);

    encoding.decode(&payload[2 + min_size..], min, out)
}

/// Big-endian signed minimum of 0 to 4 bytes
fn block_minimum(bytes: &[u8]) -> i32 {
    if bytes.is_empty() {
        return 0;
    }
    let mut value: i64 = 0;
    for &b in bytes {
        value = value * 256 + b as i64;
    }
    if bytes[0] > 127 {
        value -= 1i64 << (8 * bytes.len());
    }
    value as i32
}
