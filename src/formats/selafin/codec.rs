//! Record codec for mesh-series files
//!
//! Every record is framed the Fortran way: `[i32 length][payload][i32 length]`.
//! Integers are 32-bit, floats single precision. Values are held as `f64` in
//! memory and narrowed on write.

use std::io::{Read, Write};
use crate::error::{Error, Result};
use crate::io::{ByteOrder, ByteOrderHandler};

/// Length of the title record payload
pub const TITLE_LEN: usize = 80;

/// Length of a variable name record payload
pub const NAME_LEN: usize = 32;

/// Reads and writes framed records in one byte order
pub struct Codec {
    order: ByteOrder,
    handler: Box<dyn ByteOrderHandler>,
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec").field("order", &self.order).finish()
    }
}

impl Codec {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            handler: order.handler(),
        }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Reads one bare (unframed) integer
    pub fn read_int<R: Read + ?Sized>(&self, reader: &mut R) -> Result<i32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(self.handler.read_i32(&mut &buf[..])?)
    }

    /// Reads one bare (unframed) float
    pub fn read_raw_float<R: Read + ?Sized>(&self, reader: &mut R) -> Result<f64> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(self.handler.read_f32(&mut &buf[..])? as f64)
    }

    /// Writes one bare (unframed) float
    pub fn write_raw_float<W: Write + ?Sized>(&self, writer: &mut W, value: f64) -> Result<()> {
        let mut buf = Vec::with_capacity(4);
        self.handler.write_f32(&mut buf, value as f32)?;
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Reads the payload of one record whose leading marker was already consumed
    pub fn read_payload<R: Read + ?Sized>(&self, reader: &mut R, len: i32, limit: u64) -> Result<Vec<u8>> {
        if len < 0 || len as u64 > limit {
            return Err(Error::invalid_format(format!("Illegal record length {}", len)));
        }

        let mut payload = vec![0u8; len as usize];
        reader.read_exact(&mut payload)?;

        let trailer = self.read_int(reader)?;
        if trailer != len {
            return Err(Error::invalid_format(format!(
                "Record markers disagree: {} then {}",
                len, trailer
            )));
        }
        Ok(payload)
    }

    /// Reads one framed record; `limit` bounds the accepted payload length
    pub fn read_record<R: Read + ?Sized>(&self, reader: &mut R, limit: u64) -> Result<Vec<u8>> {
        let len = self.read_int(reader)?;
        self.read_payload(reader, len, limit)
    }

    /// Reads a framed string, dropping trailing blanks
    pub fn read_string<R: Read + ?Sized>(&self, reader: &mut R, limit: u64) -> Result<String> {
        let payload = self.read_record(reader, limit)?;
        Ok(decode_string(&payload))
    }

    /// Reads a framed array of integers
    pub fn read_ints<R: Read + ?Sized>(&self, reader: &mut R, limit: u64) -> Result<Vec<i32>> {
        let payload = self.read_record(reader, limit)?;
        if payload.len() % 4 != 0 {
            return Err(Error::invalid_format("Integer record length is not a multiple of 4"));
        }
        Ok(payload
            .chunks_exact(4)
            .filter_map(|chunk| self.handler.i32_from(chunk))
            .collect())
    }

    /// Reads a framed array of floats
    pub fn read_floats<R: Read + ?Sized>(&self, reader: &mut R, limit: u64) -> Result<Vec<f64>> {
        let payload = self.read_record(reader, limit)?;
        if payload.len() % 4 != 0 {
            return Err(Error::invalid_format("Float record length is not a multiple of 4"));
        }

        let mut values = Vec::with_capacity(payload.len() / 4);
        let mut rest = &payload[..];
        while !rest.is_empty() {
            values.push(self.handler.read_f32(&mut rest)? as f64);
        }
        Ok(values)
    }

    /// Reads a framed record holding exactly one float
    pub fn read_float<R: Read + ?Sized>(&self, reader: &mut R) -> Result<f64> {
        let values = self.read_floats(reader, 4)?;
        values
            .first()
            .copied()
            .ok_or_else(|| Error::invalid_format("Empty float record"))
    }

    fn frame(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let len = i32::try_from(payload.len())
            .map_err(|_| Error::invalid_format("Record too long"))?;
        let mut buf = Vec::with_capacity(payload.len() + 8);
        self.handler.write_i32(&mut buf, len)?;
        buf.extend_from_slice(payload);
        self.handler.write_i32(&mut buf, len)?;
        Ok(buf)
    }

    /// Writes one framed record
    pub fn write_record<W: Write + ?Sized>(&self, writer: &mut W, payload: &[u8]) -> Result<()> {
        writer.write_all(&self.frame(payload)?)?;
        Ok(())
    }

    /// Writes a framed string padded with blanks (or cut) to `len` bytes
    pub fn write_string<W: Write + ?Sized>(&self, writer: &mut W, text: &str, len: usize) -> Result<()> {
        let mut payload = text.as_bytes().to_vec();
        payload.resize(len, b' ');
        self.write_record(writer, &payload)
    }

    pub fn write_ints<W: Write + ?Sized>(&self, writer: &mut W, values: &[i32]) -> Result<()> {
        let mut payload = Vec::with_capacity(values.len() * 4);
        for &value in values {
            self.handler.write_i32(&mut payload, value)?;
        }
        self.write_record(writer, &payload)
    }

    pub fn write_floats<W: Write + ?Sized>(&self, writer: &mut W, values: &[f64]) -> Result<()> {
        let mut payload = Vec::with_capacity(values.len() * 4);
        for &value in values {
            self.handler.write_f32(&mut payload, value as f32)?;
        }
        self.write_record(writer, &payload)
    }

    pub fn write_float<W: Write + ?Sized>(&self, writer: &mut W, value: f64) -> Result<()> {
        self.write_floats(writer, &[value])
    }
}

fn decode_string(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload)
        .trim_end_matches([' ', '\0'])
        .to_string()
}

/// Cuts `text` to at most `len` bytes on a character boundary
pub fn truncate_to(text: &str, len: usize) -> String {
    let mut end = text.len().min(len);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Cuts `name` to at most [`NAME_LEN`] bytes
pub fn truncate_name(name: &str) -> String {
    truncate_to(name, NAME_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_framed_floats() {
        let codec = Codec::new(ByteOrder::BigEndian);
        let mut buf = Vec::new();
        codec.write_floats(&mut buf, &[1.0, -2.5]).unwrap();

        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[..4], &8i32.to_be_bytes());
        assert_eq!(&buf[12..], &8i32.to_be_bytes());

        let values = codec.read_floats(&mut Cursor::new(buf), 1024).unwrap();
        assert_eq!(values, vec![1.0, -2.5]);
    }

    #[test]
    fn test_little_endian_ints() {
        let codec = Codec::new(ByteOrder::LittleEndian);
        let mut buf = Vec::new();
        codec.write_ints(&mut buf, &[3, -4]).unwrap();
        assert_eq!(&buf[..4], &8i32.to_le_bytes());
        assert_eq!(codec.read_ints(&mut Cursor::new(buf), 1024).unwrap(), vec![3, -4]);
    }

    #[test]
    fn test_string_padding() {
        let codec = Codec::new(ByteOrder::BigEndian);
        let mut buf = Vec::new();
        codec.write_string(&mut buf, "VELOCITY U", NAME_LEN).unwrap();
        assert_eq!(buf.len(), NAME_LEN + 8);
        assert_eq!(codec.read_string(&mut Cursor::new(buf), 1024).unwrap(), "VELOCITY U");
    }

    #[test]
    fn test_mismatched_markers() {
        let codec = Codec::new(ByteOrder::BigEndian);
        let mut buf = Vec::new();
        codec.write_floats(&mut buf, &[1.0]).unwrap();
        let last = buf.len() - 1;
        buf[last] = 9;
        assert!(codec.read_floats(&mut Cursor::new(buf), 1024).is_err());
    }

    #[test]
    fn test_record_length_limit() {
        let codec = Codec::new(ByteOrder::BigEndian);
        let mut buf = Vec::new();
        codec.write_floats(&mut buf, &[0.0; 8]).unwrap();
        assert!(codec.read_floats(&mut Cursor::new(buf), 16).is_err());
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("short"), "short");
        assert_eq!(truncate_name(&"x".repeat(40)).len(), 32);
        assert_eq!(truncate_name(&format!("{}é", "a".repeat(31))), "a".repeat(31));
        assert_eq!(truncate_to(&"é".repeat(41), TITLE_LEN), "é".repeat(40));
        assert_eq!(truncate_to(&format!("a{}", "é".repeat(40)), TITLE_LEN).len(), 79);
    }
}
