//! In-memory model of a mesh-series header

use std::io::{Read, Write};
use crate::error::{Error, Result};
use crate::io::ByteOrder;
use crate::types::Extent;
use super::codec::{truncate_name, truncate_to, Codec, NAME_LEN, TITLE_LEN};
use super::layout::Layout;

/// Number of integer parameters stored after the variable names
pub const PARAM_COUNT: usize = 10;

/// Header of a mesh-series file
///
/// Coordinates are kept absolute; the file stores them relative to the
/// origin held in parameters 3 and 4.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    title: String,
    variables: Vec<String>,
    params: [i32; PARAM_COUNT],
    start_date: Option<[i32; 6]>,
    element_count: usize,
    points_per_element: usize,
    connectivity: Vec<i32>,
    ipobo: Vec<i32>,
    x: Vec<f64>,
    y: Vec<f64>,
    step_count: usize,
    byte_order: ByteOrder,
}

impl Header {
    /// Header of an empty mesh
    pub fn new(title: &str) -> Self {
        let mut params = [0; PARAM_COUNT];
        params[0] = 1;
        Self {
            title: truncate_to(title, TITLE_LEN),
            variables: Vec::new(),
            params,
            start_date: None,
            element_count: 0,
            points_per_element: 0,
            connectivity: Vec::new(),
            ipobo: Vec::new(),
            x: Vec::new(),
            y: Vec::new(),
            step_count: 0,
            byte_order: ByteOrder::BigEndian,
        }
    }

    /// Reads a header from the start of a file of `file_size` bytes
    pub fn read<R: Read + ?Sized>(reader: &mut R, file_size: u64) -> Result<Self> {
        let byte_order = ByteOrder::detect(reader, TITLE_LEN as i32)
            .map_err(|e| Error::invalid_format(format!("Not a mesh-series file: {}", e)))?;
        let codec = Codec::new(byte_order);

        let title_bytes = codec.read_payload(reader, TITLE_LEN as i32, file_size)?;
        let title = String::from_utf8_lossy(&title_bytes).trim_end().to_string();

        let counts = codec.read_ints(reader, file_size)?;
        if counts.len() != 2 || counts[0] < 0 {
            return Err(Error::invalid_format("Bad variable count record"));
        }

        // Each name record takes 40 bytes, so the count is bounded by the file
        if counts[0] as u64 * (NAME_LEN as u64 + 8) > file_size {
            return Err(Error::invalid_format(format!(
                "{} variables cannot fit in {} bytes",
                counts[0], file_size
            )));
        }

        let mut variables = Vec::with_capacity(counts[0] as usize);
        for _ in 0..counts[0] {
            variables.push(codec.read_string(reader, file_size)?);
        }

        let params: [i32; PARAM_COUNT] = codec
            .read_ints(reader, file_size)?
            .try_into()
            .map_err(|_| Error::invalid_format("Expected 10 integer parameters"))?;

        let start_date = if params[9] == 1 {
            let date: [i32; 6] = codec
                .read_ints(reader, file_size)?
                .try_into()
                .map_err(|_| Error::invalid_format("Expected 6 integers in start date"))?;
            Some(date)
        } else {
            None
        };

        let sizes = codec.read_ints(reader, file_size)?;
        if sizes.len() != 4 || sizes[..3].iter().any(|&n| n < 0) {
            return Err(Error::invalid_format("Bad mesh size record"));
        }
        let (element_count, point_count, points_per_element) =
            (sizes[0] as usize, sizes[1] as usize, sizes[2] as usize);

        let connectivity = codec.read_ints(reader, file_size)?;
        if connectivity.len() != element_count * points_per_element {
            return Err(Error::invalid_format(format!(
                "Connectivity holds {} entries, expected {} x {}",
                connectivity.len(),
                element_count,
                points_per_element
            )));
        }
        if let Some(bad) = connectivity.iter().find(|&&p| p < 1 || p as usize > point_count) {
            return Err(Error::invalid_format(format!("Element refers to point {}", bad)));
        }

        let ipobo = codec.read_ints(reader, file_size)?;
        let (origin_x, origin_y) = (params[2] as f64, params[3] as f64);
        let x: Vec<f64> = codec.read_floats(reader, file_size)?.iter().map(|v| v + origin_x).collect();
        let y: Vec<f64> = codec.read_floats(reader, file_size)?.iter().map(|v| v + origin_y).collect();
        if ipobo.len() != point_count || x.len() != point_count || y.len() != point_count {
            return Err(Error::invalid_format(format!(
                "Point tables disagree with point count {}",
                point_count
            )));
        }

        let mut header = Self {
            title,
            variables,
            params,
            start_date,
            element_count,
            points_per_element,
            connectivity,
            ipobo,
            x,
            y,
            step_count: 0,
            byte_order,
        };
        header.step_count = header.layout().step_count(file_size);
        Ok(header)
    }

    /// Writes the header in the byte order it was read in
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let codec = Codec::new(self.byte_order);
        codec.write_string(writer, &self.title, TITLE_LEN)?;
        codec.write_ints(writer, &[self.variables.len() as i32, 0])?;
        for name in &self.variables {
            codec.write_string(writer, name, NAME_LEN)?;
        }

        let mut params = self.params;
        params[9] = i32::from(self.start_date.is_some());
        codec.write_ints(writer, &params)?;
        if let Some(date) = &self.start_date {
            codec.write_ints(writer, date)?;
        }

        codec.write_ints(
            writer,
            &[
                self.element_count as i32,
                self.point_count() as i32,
                self.points_per_element as i32,
                1,
            ],
        )?;
        codec.write_ints(writer, &self.connectivity)?;
        codec.write_ints(writer, &self.ipobo)?;

        let (origin_x, origin_y) = self.origin();
        let x: Vec<f64> = self.x.iter().map(|v| v - origin_x).collect();
        let y: Vec<f64> = self.y.iter().map(|v| v - origin_y).collect();
        codec.write_floats(writer, &x)?;
        codec.write_floats(writer, &y)?;
        Ok(())
    }

    /// Current layout; recompute after every change of counts
    pub fn layout(&self) -> Layout {
        Layout {
            points: self.point_count() as u64,
            elements: self.element_count as u64,
            points_per_element: self.points_per_element as u64,
            variables: self.variables.len() as u64,
            has_start_date: self.start_date.is_some(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn codec(&self) -> Codec {
        Codec::new(self.byte_order)
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn point_count(&self) -> usize {
        self.x.len()
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn points_per_element(&self) -> usize {
        self.points_per_element
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub(crate) fn set_step_count(&mut self, steps: usize) {
        self.step_count = steps;
    }

    pub fn start_date(&self) -> Option<[i32; 6]> {
        self.start_date
    }

    pub fn set_start_date(&mut self, date: Option<[i32; 6]>) {
        self.start_date = date;
        self.params[9] = i32::from(date.is_some());
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.params[2] as f64, self.params[3] as f64)
    }

    /// Absolute coordinates of a point
    pub fn point(&self, index: usize) -> Option<(f64, f64)> {
        Some((*self.x.get(index)?, *self.y.get(index)?))
    }

    pub(crate) fn set_point(&mut self, index: usize, x: f64, y: f64) -> Result<()> {
        if index >= self.point_count() {
            return Err(Error::out_of_bounds(format!("Point {} of {}", index, self.point_count())));
        }
        self.x[index] = x;
        self.y[index] = y;
        Ok(())
    }

    /// Zero-based point indices of an element
    pub fn element(&self, index: usize) -> Option<Vec<usize>> {
        if index >= self.element_count {
            return None;
        }
        let start = index * self.points_per_element;
        let vertices = self.connectivity[start..start + self.points_per_element]
            .iter()
            .map(|&p| (p - 1) as usize)
            .collect();
        Some(vertices)
    }

    /// Extent of all points, `None` for an empty mesh
    pub fn bounding_box(&self) -> Option<Extent> {
        let (&x0, &y0) = (self.x.first()?, self.y.first()?);
        let mut extent = Extent::new(x0, y0, x0, y0);
        for (&x, &y) in self.x.iter().zip(&self.y) {
            extent.expand(x, y);
        }
        Some(extent)
    }

    /// Nearest point whose squared distance is at most `max_sq_dist`
    pub fn closest_point(&self, x: f64, y: f64, max_sq_dist: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, (&px, &py)) in self.x.iter().zip(&self.y).enumerate() {
            let d = (px - x) * (px - x) + (py - y) * (py - y);
            if d <= max_sq_dist && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Appends a point, returning its index
    pub fn add_point(&mut self, x: f64, y: f64) -> usize {
        self.x.push(x);
        self.y.push(y);
        self.ipobo.push(0);
        self.x.len() - 1
    }

    /// Removes a point together with every element that uses it
    pub fn remove_point(&mut self, index: usize) -> Result<()> {
        if index >= self.point_count() {
            return Err(Error::out_of_bounds(format!("Point {} of {}", index, self.point_count())));
        }
        self.x.remove(index);
        self.y.remove(index);
        self.ipobo.remove(index);

        let removed = index as i32 + 1;
        if self.points_per_element > 0 {
            let kept: Vec<i32> = self
                .connectivity
                .chunks_exact(self.points_per_element)
                .filter(|element| !element.contains(&removed))
                .flatten()
                .map(|&p| if p > removed { p - 1 } else { p })
                .collect();
            self.element_count = kept.len() / self.points_per_element;
            self.connectivity = kept;
        }
        Ok(())
    }

    /// Appends an element over zero-based point indices
    ///
    /// The first element of a mesh fixes the number of points per element.
    pub fn push_element(&mut self, vertices: &[usize]) -> Result<usize> {
        let establishing = self.element_count == 0 && self.points_per_element == 0;
        if establishing && vertices.len() < 3 {
            return Err(Error::unsupported("An element needs at least 3 vertices"));
        }
        if !establishing && vertices.len() != self.points_per_element {
            return Err(Error::unsupported(format!(
                "Elements of this mesh have {} vertices, got {}",
                self.points_per_element,
                vertices.len()
            )));
        }
        if let Some(&bad) = vertices.iter().find(|&&v| v >= self.point_count()) {
            return Err(Error::out_of_bounds(format!("Vertex refers to point {}", bad)));
        }

        self.points_per_element = vertices.len();
        self.connectivity.extend(vertices.iter().map(|&v| v as i32 + 1));
        self.element_count += 1;
        Ok(self.element_count - 1)
    }

    pub fn remove_element(&mut self, index: usize) -> Result<()> {
        if index >= self.element_count {
            return Err(Error::out_of_bounds(format!(
                "Element {} of {}",
                index, self.element_count
            )));
        }
        let start = index * self.points_per_element;
        self.connectivity.drain(start..start + self.points_per_element);
        self.element_count -= 1;
        Ok(())
    }

    fn check_variable(&self, index: usize) -> Result<()> {
        if index >= self.variables.len() {
            return Err(Error::out_of_bounds(format!(
                "Variable {} of {}",
                index,
                self.variables.len()
            )));
        }
        Ok(())
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        let name = truncate_name(name);
        self.variables.iter().position(|v| *v == name)
    }

    pub fn add_variable(&mut self, name: &str) -> Result<usize> {
        if self.variable_index(name).is_some() {
            return Err(Error::unsupported(format!("A field named {} already exists", name)));
        }
        self.variables.push(truncate_name(name));
        Ok(self.variables.len() - 1)
    }

    pub fn remove_variable(&mut self, index: usize) -> Result<String> {
        self.check_variable(index)?;
        Ok(self.variables.remove(index))
    }

    /// Reorders variables so that new position `i` holds old variable `map[i]`
    pub fn reorder_variables(&mut self, map: &[usize]) -> Result<()> {
        let n = self.variables.len();
        let mut seen = vec![false; n];
        if map.len() != n {
            return Err(Error::invalid_format(format!("Field map of {} entries for {} fields", map.len(), n)));
        }
        for &old in map {
            if old >= n || seen[old] {
                return Err(Error::invalid_format("Field map is not a permutation"));
            }
            seen[old] = true;
        }
        self.variables = map.iter().map(|&old| self.variables[old].clone()).collect();
        Ok(())
    }

    pub fn rename_variable(&mut self, index: usize, name: &str) -> Result<()> {
        self.check_variable(index)?;
        self.variables[index] = truncate_name(name);
        Ok(())
    }
}
