//! Features exchanged with mesh-series layers

use serde::Serialize;
use crate::types::Extent;

/// Geometry of a feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Geometry {
    Point { x: f64, y: f64 },
    /// Exterior ring; rings returned by layers are closed
    Polygon(Vec<(f64, f64)>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::Polygon(_) => "Polygon",
        }
    }

    /// Bounding box of the geometry; `None` for an empty ring
    pub fn envelope(&self) -> Option<Extent> {
        match self {
            Geometry::Point { x, y } => Some(Extent::new(*x, *y, *x, *y)),
            Geometry::Polygon(ring) => {
                let (&(x0, y0), rest) = ring.split_first()?;
                let mut extent = Extent::new(x0, y0, x0, y0);
                for &(x, y) in rest {
                    extent.expand(x, y);
                }
                Some(extent)
            }
        }
    }

    /// Distinct vertices of a polygon ring, without the closing vertex
    pub fn ring_vertices(&self) -> Option<&[(f64, f64)]> {
        let Geometry::Polygon(ring) = self else {
            return None;
        };
        match (ring.first(), ring.last()) {
            (Some(first), Some(last)) if ring.len() > 1 && first == last => {
                Some(&ring[..ring.len() - 1])
            }
            _ => Some(ring),
        }
    }
}

/// Attribute types; mesh-series files only store `Real`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldType {
    Real,
    Integer,
    String,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDefn {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDefn {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Real)
    }
}

/// One point or element with its attribute values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub fid: usize,
    pub geometry: Geometry,
    pub fields: Vec<f64>,
}

impl Feature {
    pub fn point(x: f64, y: f64, fields: Vec<f64>) -> Self {
        Self {
            fid: 0,
            geometry: Geometry::Point { x, y },
            fields,
        }
    }

    pub fn polygon(ring: Vec<(f64, f64)>) -> Self {
        Self {
            fid: 0,
            geometry: Geometry::Polygon(ring),
            fields: Vec::new(),
        }
    }

    /// Value of a field, zero when unset
    pub fn field(&self, index: usize) -> f64 {
        self.fields.get(index).copied().unwrap_or(0.0)
    }
}
