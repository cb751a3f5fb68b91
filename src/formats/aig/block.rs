//! Block index parsing and block payload decoding

use std::io::{Read, SeekFrom};
use crate::cache::BlockIndex;
use crate::compression::{decode_compressed, raw};
use crate::error::{Error, Result};
use crate::io::{ByteOrder, SeekableReader};
use crate::types::CellType;

const INDEX_MAGIC: [u8; 4] = [0x00, 0x00, 0x27, 0x0A];
const FILE_HEADER_LEN: usize = 100;
const MAX_BLOCK_BYTES: u32 = 131_070;

/// Parses a tile's block index file (`<tile>x.adf`)
pub fn read_block_index(reader: &mut dyn SeekableReader) -> Result<BlockIndex> {
    let mut header = [0u8; FILE_HEADER_LEN];
    reader.seek(SeekFrom::Start(0))?;
    reader.read_exact(&mut header)?;

    if header[..4] != INDEX_MAGIC {
        return Err(Error::invalid_format("Block index file has wrong magic number"));
    }

    let be = ByteOrder::BigEndian.handler();
    let length_words = be.i32_from(&header[24..]).unwrap_or_default();
    let length_bytes = (length_words.max(0) as usize) * 2;
    if length_bytes <= FILE_HEADER_LEN {
        return Ok(BlockIndex::default());
    }

    let count = (length_bytes - FILE_HEADER_LEN) / 8;
    let mut entries = vec![0u8; count * 8];
    reader.read_exact(&mut entries)?;

    let mut index = BlockIndex {
        offsets: Vec::with_capacity(count),
        sizes: Vec::with_capacity(count),
    };
    for entry in entries.chunks_exact(8) {
        let offset = be.i32_from(entry).unwrap_or_default();
        let size = be.i32_from(&entry[4..]).unwrap_or_default();
        if offset < 0 || size < 0 {
            return Err(Error::invalid_format(format!(
                "Negative block index entry ({}, {})",
                offset, size
            )));
        }
        index.offsets.push(offset as u64 * 2);
        index.sizes.push(size as u32 * 2);
    }

    Ok(index)
}

/// Reads the payload of one block, checking its size prefix against the index
pub fn read_block_payload(reader: &mut dyn SeekableReader, offset: u64, size: u32) -> Result<Vec<u8>> {
    if size == 0 || size > MAX_BLOCK_BYTES {
        return Err(Error::invalid_format(format!("Illegal block size {} at {}", size, offset)));
    }

    reader.seek(SeekFrom::Start(offset))?;
    let mut prefix = [0u8; 2];
    reader.read_exact(&mut prefix)?;
    let stored = ByteOrder::BigEndian.handler().read_u16(&mut &prefix[..])? as u32 * 2;
    if stored != size {
        return Err(Error::invalid_format(format!(
            "Block at {} is {} bytes but its index entry says {}",
            offset, stored, size
        )));
    }

    let mut payload = vec![0u8; size as usize];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// Decodes a payload into integer cells, truncating float covers
pub fn decode_i32(payload: &[u8], cell_type: CellType, compressed: bool, out: &mut [i32]) -> Result<()> {
    match cell_type {
        CellType::Float => {
            let mut floats = vec![0f32; out.len()];
            raw::unpack_f32(payload, &mut floats)?;
            for (cell, value) in out.iter_mut().zip(floats) {
                *cell = value as i32;
            }
            Ok(())
        }
        CellType::Int if compressed => decode_compressed(payload, out),
        CellType::Int => raw::unpack(payload, 32, 0, out),
    }
}

/// Decodes a payload into float cells, widening integer covers
pub fn decode_f32(payload: &[u8], cell_type: CellType, compressed: bool, out: &mut [f32]) -> Result<()> {
    match cell_type {
        CellType::Float => raw::unpack_f32(payload, out),
        CellType::Int => {
            let mut ints = vec![0i32; out.len()];
            decode_i32(payload, cell_type, compressed, &mut ints)?;
            for (cell, value) in out.iter_mut().zip(ints) {
                *cell = value as f32;
            }
            Ok(())
        }
    }
}
