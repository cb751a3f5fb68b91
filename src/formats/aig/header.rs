//! Readers for the cover-level files: `hdr.adf`, `dblbnd.adf` and `sta.adf`

use std::io::{self, Read};
use std::path::Path;
use crate::error::{Error, Result};
use crate::types::{CellType, Extent, Statistics};
use crate::io::ByteOrder;
use super::fs::{open_with_case_fallback, GridFileSystem};

const HEADER_MIN_LEN: usize = 308;

/// Fields decoded from `hdr.adf`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHeader {
    pub cell_type: CellType,
    pub compressed: bool,
    pub cell_size_x: f64,
    pub cell_size_y: f64,
    pub blocks_per_row: i32,
    pub blocks_per_column: i32,
    pub block_x_size: i32,
    pub block_y_size: i32,
}

fn read_file(fs: &dyn GridFileSystem, path: &Path) -> io::Result<Vec<u8>> {
    let mut reader = open_with_case_fallback(fs, path)?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn short_file(path: &Path, wanted: usize, got: usize) -> Error {
    Error::invalid_format(format!(
        "{} is {} bytes, expected at least {}",
        path.display(),
        got,
        wanted
    ))
}

/// Reads the grid header of the cover in `cover_dir`
pub fn read_header(fs: &dyn GridFileSystem, cover_dir: &Path) -> Result<GridHeader> {
    let path = cover_dir.join("hdr.adf");
    let bytes = read_file(fs, &path)?;
    if bytes.len() < HEADER_MIN_LEN {
        return Err(short_file(&path, HEADER_MIN_LEN, bytes.len()));
    }

    let be = ByteOrder::BigEndian.handler();
    // Length is checked above, so every fixed offset is present.
    let int_at = |offset: usize| be.i32_from(&bytes[offset..]).unwrap_or_default();
    let float_at = |offset: usize| be.f64_from(&bytes[offset..]).unwrap_or_default();

    let code = int_at(16);
    let cell_type = CellType::from_code(code)
        .ok_or_else(|| Error::invalid_format(format!("Unknown grid cell type {}", code)))?;

    Ok(GridHeader {
        cell_type,
        compressed: int_at(20) == 0,
        cell_size_x: float_at(256),
        cell_size_y: float_at(264),
        blocks_per_row: int_at(288),
        blocks_per_column: int_at(292),
        block_x_size: int_at(296),
        block_y_size: int_at(304),
    })
}

fn read_four_doubles(fs: &dyn GridFileSystem, path: &Path) -> Result<[f64; 4]> {
    let bytes = read_file(fs, path)?;
    if bytes.len() < 32 {
        return Err(short_file(path, 32, bytes.len()));
    }

    let be = ByteOrder::BigEndian.handler();
    let mut values = [0.0; 4];
    let mut rest = &bytes[..32];
    for value in values.iter_mut() {
        *value = be.read_f64(&mut rest)?;
    }
    Ok(values)
}

/// Reads the cover extent from `dblbnd.adf`
pub fn read_bounds(fs: &dyn GridFileSystem, cover_dir: &Path) -> Result<Extent> {
    let [llx, lly, urx, ury] = read_four_doubles(fs, &cover_dir.join("dblbnd.adf"))?;
    Ok(Extent::new(llx, lly, urx, ury))
}

/// Reads the summary statistics from `sta.adf`
///
/// Some covers ship without statistics; a missing file yields `None`.
pub fn read_statistics(fs: &dyn GridFileSystem, cover_dir: &Path) -> Result<Option<Statistics>> {
    let path = cover_dir.join("sta.adf");
    match read_four_doubles(fs, &path) {
        Ok([min, max, mean, std_dev]) => Ok(Some(Statistics { min, max, mean, std_dev })),
        Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Grid statistics file not found");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::aig::fs::LocalFileSystem;
    use crate::formats::aig::testing::{bounds_bytes, header_bytes};

    #[test]
    fn test_read_header_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("hdr.adf"),
            header_bytes(CellType::Float, false, (2.0, 3.0), (4, 5), (8, 16)),
        )
        .unwrap();

        let header = read_header(&LocalFileSystem::default(), dir.path()).unwrap();
        assert_eq!(header.cell_type, CellType::Float);
        assert!(!header.compressed);
        assert_eq!(header.cell_size_x, 2.0);
        assert_eq!(header.cell_size_y, 3.0);
        assert_eq!((header.blocks_per_row, header.blocks_per_column), (4, 5));
        assert_eq!((header.block_x_size, header.block_y_size), (8, 16));
    }

    #[test]
    fn test_short_header() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hdr.adf"), vec![0u8; 100]).unwrap();
        assert!(matches!(
            read_header(&LocalFileSystem::default(), dir.path()),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_unknown_cell_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = header_bytes(CellType::Int, true, (1.0, 1.0), (1, 1), (4, 4));
        bytes[16..20].copy_from_slice(&7i32.to_be_bytes());
        std::fs::write(dir.path().join("hdr.adf"), bytes).unwrap();
        assert!(read_header(&LocalFileSystem::default(), dir.path()).is_err());
    }

    #[test]
    fn test_read_bounds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dblbnd.adf"), bounds_bytes(1.0, 2.0, 11.0, 22.0)).unwrap();
        let extent = read_bounds(&LocalFileSystem::default(), dir.path()).unwrap();
        assert_eq!(extent, Extent::new(1.0, 2.0, 11.0, 22.0));
    }

    #[test]
    fn test_statistics_missing_and_short() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFileSystem::default();
        assert_eq!(read_statistics(&fs, dir.path()).unwrap(), None);

        std::fs::write(dir.path().join("sta.adf"), vec![0u8; 16]).unwrap();
        assert!(read_statistics(&fs, dir.path()).is_err());

        std::fs::write(dir.path().join("sta.adf"), bounds_bytes(-1.0, 9.0, 4.0, 0.5)).unwrap();
        let stats = read_statistics(&fs, dir.path()).unwrap().unwrap();
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.std_dev, 0.5);
    }
}
