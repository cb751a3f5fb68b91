//! Byte order (endianness) handling
//!
//! Provides utilities for reading and writing multi-byte values in different
//! byte orders. Grid covers are always big-endian; mesh-series files are
//! normally big-endian but little-endian files exist in the wild.

use std::io::{self, Read, Result, Write};

/// Represents the byte order (endianness) of binary data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (least significant byte first)
    LittleEndian,
    /// Big-endian byte order (most significant byte first)
    BigEndian,
}

impl ByteOrder {
    /// Detects byte order from a record length marker
    ///
    /// Framed records start with their payload length. When the expected
    /// length is known (the mesh-series title is always 80 bytes), the marker
    /// tells which byte order the writer used.
    pub fn from_record_marker(marker: [u8; 4], expected: i32) -> Option<Self> {
        if i32::from_be_bytes(marker) == expected {
            Some(ByteOrder::BigEndian)
        } else if i32::from_le_bytes(marker) == expected {
            Some(ByteOrder::LittleEndian)
        } else {
            None
        }
    }

    /// Reads a record marker and detects the byte order from it
    pub fn detect<R: Read + ?Sized>(reader: &mut R, expected: i32) -> Result<Self> {
        let mut marker = [0u8; 4];
        reader.read_exact(&mut marker)?;

        Self::from_record_marker(marker, expected).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Invalid record marker: {:02X}{:02X}{:02X}{:02X}",
                    marker[0], marker[1], marker[2], marker[3]
                ),
            )
        })
    }

    /// Creates a handler for this byte order
    pub fn handler(&self) -> Box<dyn ByteOrderHandler> {
        match self {
            ByteOrder::LittleEndian => Box::new(LittleEndian),
            ByteOrder::BigEndian => Box::new(BigEndian),
        }
    }
}

/// Trait for reading and writing typed values with a specific byte order
pub trait ByteOrderHandler: Send + Sync {
    /// Reads an unsigned 16-bit integer
    fn read_u16(&self, reader: &mut dyn Read) -> Result<u16>;

    /// Reads a signed 32-bit integer
    fn read_i32(&self, reader: &mut dyn Read) -> Result<i32>;

    /// Reads a 32-bit floating point number
    fn read_f32(&self, reader: &mut dyn Read) -> Result<f32>;

    /// Reads a 64-bit floating point number
    fn read_f64(&self, reader: &mut dyn Read) -> Result<f64>;

    /// Writes a signed 32-bit integer
    fn write_i32(&self, writer: &mut dyn Write, value: i32) -> Result<()>;

    /// Writes a 32-bit floating point number
    fn write_f32(&self, writer: &mut dyn Write, value: f32) -> Result<()>;

    /// Decodes a signed 32-bit integer from the start of a slice
    fn i32_from(&self, bytes: &[u8]) -> Option<i32>;

    /// Decodes a 64-bit float from the start of a slice
    fn f64_from(&self, bytes: &[u8]) -> Option<f64>;
}

fn array<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    bytes.get(..N)?.try_into().ok()
}

struct LittleEndian;

impl ByteOrderHandler for LittleEndian {
    fn read_u16(&self, reader: &mut dyn Read) -> Result<u16> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_i32(&self, reader: &mut dyn Read) -> Result<i32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_f32(&self, reader: &mut dyn Read) -> Result<f32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    fn read_f64(&self, reader: &mut dyn Read) -> Result<f64> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    fn write_i32(&self, writer: &mut dyn Write, value: i32) -> Result<()> {
        writer.write_all(&value.to_le_bytes())
    }

    fn write_f32(&self, writer: &mut dyn Write, value: f32) -> Result<()> {
        writer.write_all(&value.to_le_bytes())
    }

    fn i32_from(&self, bytes: &[u8]) -> Option<i32> {
        array(bytes).map(i32::from_le_bytes)
    }

    fn f64_from(&self, bytes: &[u8]) -> Option<f64> {
        array(bytes).map(f64::from_le_bytes)
    }
}

struct BigEndian;

impl ByteOrderHandler for BigEndian {
    fn read_u16(&self, reader: &mut dyn Read) -> Result<u16> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_i32(&self, reader: &mut dyn Read) -> Result<i32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    fn read_f32(&self, reader: &mut dyn Read) -> Result<f32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(f32::from_be_bytes(buf))
    }

    fn read_f64(&self, reader: &mut dyn Read) -> Result<f64> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(f64::from_be_bytes(buf))
    }

    fn write_i32(&self, writer: &mut dyn Write, value: i32) -> Result<()> {
        writer.write_all(&value.to_be_bytes())
    }

    fn write_f32(&self, writer: &mut dyn Write, value: f32) -> Result<()> {
        writer.write_all(&value.to_be_bytes())
    }

    fn i32_from(&self, bytes: &[u8]) -> Option<i32> {
        array(bytes).map(i32::from_be_bytes)
    }

    fn f64_from(&self, bytes: &[u8]) -> Option<f64> {
        array(bytes).map(f64::from_be_bytes)
    }
}
