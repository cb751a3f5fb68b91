//! Bit-packed raw block decoding
//!
//! Raw blocks store one unsigned value per cell at a fixed bit width,
//! most significant bits first. The block minimum is added to each value.

use crate::error::{Error, Result};

/// Fills every cell with the block minimum
pub fn constant(min: i32, out: &mut [i32]) {
    out.fill(min);
}

/// Unpacks `out.len()` values of `bits` width (1, 4, 8, 16 or 32)
pub fn unpack(data: &[u8], bits: u32, min: i32, out: &mut [i32]) -> Result<()> {
    let needed = (out.len() * bits as usize).div_ceil(8);
    if data.len() < needed {
        return Err(Error::invalid_format(format!(
            "Raw {}-bit block needs {} bytes, only {} present",
            bits,
            needed,
            data.len()
        )));
    }

    match bits {
        1 => {
            for (i, cell) in out.iter_mut().enumerate() {
                let bit = (data[i / 8] >> (7 - (i % 8))) & 1;
                *cell = (bit as i32).wrapping_add(min);
            }
        }
        4 => {
            for (i, cell) in out.iter_mut().enumerate() {
                let byte = data[i / 2];
                let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0F };
                *cell = (nibble as i32).wrapping_add(min);
            }
        }
        8 => {
            for (cell, &byte) in out.iter_mut().zip(data) {
                *cell = (byte as i32).wrapping_add(min);
            }
        }
        16 => {
            for (cell, pair) in out.iter_mut().zip(data.chunks_exact(2)) {
                let value = u16::from_be_bytes([pair[0], pair[1]]);
                *cell = (value as i32).wrapping_add(min);
            }
        }
        32 => {
            for (cell, quad) in out.iter_mut().zip(data.chunks_exact(4)) {
                let value = i32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
                *cell = value.wrapping_add(min);
            }
        }
        _ => {
            return Err(Error::unsupported(format!("Raw block bit width {}", bits)));
        }
    }

    Ok(())
}

/// Decodes big-endian f32 cells
pub fn unpack_f32(data: &[u8], out: &mut [f32]) -> Result<()> {
    if data.len() < out.len() * 4 {
        return Err(Error::invalid_format(format!(
            "Float block needs {} bytes, only {} present",
            out.len() * 4,
            data.len()
        )));
    }

    for (cell, quad) in out.iter_mut().zip(data.chunks_exact(4)) {
        *cell = f32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
    }
    Ok(())
}
