//! Byte positions inside a mesh-series file
//!
//! Every offset in the file follows from five numbers: point count, element
//! count, points per element, variable count and whether a start date is
//! stored. A [`Layout`] captures them at one moment; take a new one from the
//! header after any of them changes.

use serde::Serialize;

const TITLE_RECORD: u64 = 88;
const COUNTS_RECORD: u64 = 16;
const NAME_RECORD: u64 = 40;
const PARAMS_RECORD: u64 = 48;
const DATE_RECORD: u64 = 32;
const SIZES_RECORD: u64 = 24;
const TIME_RECORD: u64 = 12;

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Snapshot of the counts that determine the file layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub points: u64,
    pub elements: u64,
    pub points_per_element: u64,
    pub variables: u64,
    pub has_start_date: bool,
}

impl Layout {
    fn array_record(&self) -> u64 {
        (self.points + 2) * 4
    }

    /// Offset of the connectivity record
    fn connectivity_position(&self) -> u64 {
        TITLE_RECORD
            + COUNTS_RECORD
            + NAME_RECORD * self.variables
            + PARAMS_RECORD
            + if self.has_start_date { DATE_RECORD } else { 0 }
            + SIZES_RECORD
    }

    /// Size of everything before the first time step
    pub fn header_size(&self) -> u64 {
        self.connectivity_position()
            + (self.elements * self.points_per_element + 2) * 4
            + self.array_record() * 3
    }

    /// Size of one time step: the time record plus one array per variable
    pub fn step_size(&self) -> u64 {
        TIME_RECORD + self.variables * self.array_record()
    }

    /// Offset of a step, a variable array within it, or a single value
    ///
    /// `(None, None)` is the start of the step's time record. With a variable
    /// and no point it is the start of that variable's framed array; with
    /// both it is the value itself. A point without a variable addresses the
    /// first variable.
    pub fn position(&self, step: usize, point: Option<usize>, var: Option<usize>) -> u64 {
        let base = self.header_size() + step as u64 * self.step_size();
        if point.is_none() && var.is_none() {
            return base;
        }

        let array = base + TIME_RECORD + var.unwrap_or(0) as u64 * self.array_record();
        match point {
            Some(point) => array + 4 + point as u64 * 4,
            None => array,
        }
    }

    /// Offset of the name record of a variable
    pub fn variable_name_position(&self, var: usize) -> u64 {
        TITLE_RECORD + COUNTS_RECORD + NAME_RECORD * var as u64
    }

    /// Offset of one stored coordinate value
    pub fn coordinate_position(&self, axis: Axis, point: usize) -> u64 {
        let x_record = self.connectivity_position()
            + (self.elements * self.points_per_element + 2) * 4
            + self.array_record();
        let record = match axis {
            Axis::X => x_record,
            Axis::Y => x_record + self.array_record(),
        };
        record + 4 + point as u64 * 4
    }

    /// Number of complete steps in a file of `file_size` bytes
    pub fn step_count(&self, file_size: u64) -> usize {
        if file_size <= self.header_size() {
            return 0;
        }
        ((file_size - self.header_size()) / self.step_size()) as usize
    }
}
