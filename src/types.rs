//! Core data types for rastermesh

use serde::Serialize;

/// Integer nodata sentinel used by grid covers
pub const GRID_NO_DATA: i32 = -2147483647;

/// Floating point nodata sentinel used by grid covers
pub const GRID_FLOAT_NO_DATA: f32 = -f32::MAX;

/// Native cell type of a grid cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellType {
    /// Signed 32-bit integer cells
    Int,
    /// 32-bit floating point cells
    Float,
}

impl CellType {
    /// Maps the header code (1 = integer, 2 = float)
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(CellType::Int),
            2 => Some(CellType::Float),
            _ => None,
        }
    }

    /// Returns the name of this cell type
    pub fn name(&self) -> &'static str {
        match self {
            CellType::Int => "Int32",
            CellType::Float => "Float32",
        }
    }

    /// Returns the nodata sentinel for this cell type, widened to f64
    pub fn no_data(&self) -> f64 {
        match self {
            CellType::Int => GRID_NO_DATA as f64,
            CellType::Float => GRID_FLOAT_NO_DATA as f64,
        }
    }
}

/// Represents raster dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u64,
    /// Height in pixels
    pub height: u64,
}

impl Dimensions {
    /// Creates new dimensions
    pub fn new(width: u64, height: u64) -> Self {
        Self { width, height }
    }

    /// Returns the total number of pixels
    pub fn pixel_count(&self) -> u64 {
        self.width * self.height
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Grows the extent to include a point
    pub fn expand(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Whether two extents overlap; touching edges count
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

/// Summary statistics stored alongside a grid cover
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_type_from_code() {
        assert_eq!(CellType::from_code(1), Some(CellType::Int));
        assert_eq!(CellType::from_code(2), Some(CellType::Float));
        assert_eq!(CellType::from_code(3), None);
    }

    #[test]
    fn test_cell_type_no_data() {
        assert_eq!(CellType::Int.no_data(), -2147483647.0);
        assert_eq!(CellType::Float.no_data(), -f32::MAX as f64);
    }

    #[test]
    fn test_dimensions() {
        let dims = Dimensions::new(100, 200);
        assert_eq!(dims.width, 100);
        assert_eq!(dims.height, 200);
        assert_eq!(dims.pixel_count(), 20000);
    }

    #[test]
    fn test_extent_expand() {
        let mut extent = Extent::new(0.0, 0.0, 1.0, 1.0);
        extent.expand(-2.0, 3.0);
        assert_eq!(extent, Extent::new(-2.0, 0.0, 1.0, 3.0));
        assert_eq!(extent.width(), 3.0);
        assert_eq!(extent.height(), 3.0);
    }

    #[test]
    fn test_extent_intersects() {
        let a = Extent::new(0.0, 0.0, 2.0, 2.0);
        assert!(a.intersects(&Extent::new(1.0, 1.0, 3.0, 3.0)));
        assert!(a.intersects(&Extent::new(2.0, 0.0, 4.0, 1.0)));
        assert!(!a.intersects(&Extent::new(2.5, 0.0, 4.0, 1.0)));
        assert!(!a.intersects(&Extent::new(0.0, -3.0, 1.0, -0.5)));
    }
}
