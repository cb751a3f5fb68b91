//! Point and element layers of one time step

use crate::error::{Error, Result};
use crate::types::Extent;
use super::feature::{Feature, FieldDefn, FieldType, Geometry};
use super::rewrite::{PointEdit, RewritePlan, VariableSource};
use super::SelafinDataset;

/// The two views of a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// One point feature per mesh node
    Points,
    /// One polygon feature per element; attributes average its nodes
    Elements,
}

impl LayerKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            LayerKind::Points => "p",
            LayerKind::Elements => "e",
        }
    }
}

/// Optional layer abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    RandomRead,
    SequentialWrite,
    RandomWrite,
    FastFeatureCount,
    FastGetExtent,
    FastSetNextByIndex,
    FastSpatialFilter,
    CreateField,
    CreateGeomField,
    DeleteField,
    ReorderFields,
    AlterFieldDefn,
    DeleteFeature,
    Transactions,
}

/// A layer borrows its dataset; mutations go straight to the file
pub struct Layer<'a> {
    dataset: &'a mut SelafinDataset,
    step: usize,
    kind: LayerKind,
}

fn require_real(field: &FieldDefn) -> Result<()> {
    if field.field_type != FieldType::Real {
        return Err(Error::unsupported(format!(
            "Field {} is {:?}; only double precision fields are allowed",
            field.name, field.field_type
        )));
    }
    Ok(())
}

impl<'a> Layer<'a> {
    pub(crate) fn new(dataset: &'a mut SelafinDataset, step: usize, kind: LayerKind) -> Self {
        Self { dataset, step, kind }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn name(&self) -> String {
        self.dataset.layer_name(self.step, self.kind)
    }

    pub fn feature_count(&self) -> usize {
        let header = self.dataset.header();
        match self.kind {
            LayerKind::Points => header.point_count(),
            LayerKind::Elements => header.element_count(),
        }
    }

    pub fn fields(&self) -> Vec<FieldDefn> {
        self.dataset
            .header()
            .variables()
            .iter()
            .map(FieldDefn::real)
            .collect()
    }

    /// Extent of the mesh; `None` while it has no points
    pub fn extent(&self) -> Option<Extent> {
        self.dataset.header().bounding_box()
    }

    pub fn supports(&self, capability: Capability) -> bool {
        let update = self.dataset.is_update();
        match capability {
            Capability::RandomRead
            | Capability::FastFeatureCount
            | Capability::FastGetExtent
            | Capability::FastSetNextByIndex => true,
            Capability::SequentialWrite
            | Capability::RandomWrite
            | Capability::CreateField
            | Capability::DeleteField
            | Capability::ReorderFields
            | Capability::AlterFieldDefn
            | Capability::DeleteFeature => update,
            Capability::FastSpatialFilter | Capability::CreateGeomField | Capability::Transactions => false,
        }
    }

    fn value(&mut self, point: usize, var: usize) -> Result<f64> {
        let position = self.dataset.header().layout().position(self.step, Some(point), Some(var));
        self.dataset.read_value(position)
    }

    /// Reads one feature
    pub fn feature(&mut self, fid: usize) -> Result<Feature> {
        let count = self.feature_count();
        if fid >= count {
            return Err(Error::out_of_bounds(format!("Feature {} of {}", fid, count)));
        }
        let var_count = self.dataset.header().variables().len();

        match self.kind {
            LayerKind::Points => {
                let (x, y) = self.dataset.header().point(fid).unwrap_or_default();
                let mut fields = Vec::with_capacity(var_count);
                for var in 0..var_count {
                    fields.push(self.value(fid, var)?);
                }
                Ok(Feature {
                    fid,
                    geometry: Geometry::Point { x, y },
                    fields,
                })
            }
            LayerKind::Elements => {
                let vertices = self.dataset.header().element(fid).unwrap_or_default();
                let mut ring = Vec::with_capacity(vertices.len() + 1);
                let mut sums = vec![0.0; var_count];
                for &point in &vertices {
                    ring.push(self.dataset.header().point(point).unwrap_or_default());
                    for (var, sum) in sums.iter_mut().enumerate() {
                        *sum += self.value(point, var)?;
                    }
                }
                if let Some(&first) = ring.first() {
                    ring.push(first);
                }

                let n = vertices.len().max(1) as f64;
                Ok(Feature {
                    fid,
                    geometry: Geometry::Polygon(ring),
                    fields: sums.into_iter().map(|sum| sum / n).collect(),
                })
            }
        }
    }

    /// Iterates over every feature in id order
    pub fn features(&mut self) -> Features<'_, 'a> {
        Features {
            layer: self,
            next: 0,
            filter: None,
        }
    }

    /// Iterates in id order starting at feature `index`
    pub fn features_from(&mut self, index: usize) -> Result<Features<'_, 'a>> {
        let count = self.feature_count();
        if index >= count {
            return Err(Error::out_of_bounds(format!("Feature {} of {}", index, count)));
        }
        Ok(Features {
            layer: self,
            next: index,
            filter: None,
        })
    }

    fn wrong_geometry(&self, geometry: &Geometry) -> Error {
        let expected = match self.kind {
            LayerKind::Points => "Point",
            LayerKind::Elements => "Polygon",
        };
        Error::unsupported(format!(
            "The new feature should be of the same {} geometry as the existing ones in the layer, got {}",
            expected,
            geometry.type_name()
        ))
    }

    /// Adds a field, zero at every point and step
    pub fn create_field(&mut self, field: &FieldDefn) -> Result<()> {
        tracing::debug!(name = %field.name, field_type = ?field.field_type, "create_field");
        self.dataset.require_update()?;
        require_real(field)?;

        let mut next = self.dataset.header().clone();
        let old_count = next.variables().len();
        next.add_variable(&field.name)?;

        let mut plan = RewritePlan::identity(old_count);
        plan.variables.push(VariableSource::Zeros);
        self.dataset.apply(next, plan)
    }

    pub fn delete_field(&mut self, index: usize) -> Result<()> {
        tracing::debug!(index, "delete_field");
        self.dataset.require_update()?;

        let mut next = self.dataset.header().clone();
        next.remove_variable(index)?;

        let mut plan = RewritePlan::identity(next.variables().len() + 1);
        plan.variables.remove(index);
        self.dataset.apply(next, plan)
    }

    /// Reorders fields so that new field `i` is old field `map[i]`
    pub fn reorder_fields(&mut self, map: &[usize]) -> Result<()> {
        tracing::debug!(?map, "reorder_fields");
        self.dataset.require_update()?;

        let mut next = self.dataset.header().clone();
        next.reorder_variables(map)?;

        let mut plan = RewritePlan::identity(map.len());
        plan.variables = map.iter().map(|&old| VariableSource::Existing(old)).collect();
        self.dataset.apply(next, plan)
    }

    /// Renames a field in place; the type must stay `Real`
    pub fn alter_field_defn(&mut self, index: usize, field: &FieldDefn) -> Result<()> {
        tracing::debug!(index, name = %field.name, "alter_field_defn");
        self.dataset.require_update()?;
        require_real(field)?;

        let mut next = self.dataset.header().clone();
        next.rename_variable(index, &field.name)?;
        self.dataset.write_variable_name(&next, index)?;
        self.dataset.commit(next);
        Ok(())
    }

    /// Adds a feature and returns its id
    ///
    /// Element vertices reuse existing points closer than a tolerance derived
    /// from the mesh extent and density; the others become new points.
    pub fn create_feature(&mut self, feature: &Feature) -> Result<usize> {
        tracing::debug!(kind = ?self.kind, geometry = feature.geometry.type_name(), "create_feature");
        self.dataset.require_update()?;

        let mut next = self.dataset.header().clone();
        let var_count = next.variables().len();

        let (fid, edit) = match (self.kind, &feature.geometry) {
            (LayerKind::Points, Geometry::Point { x, y }) => {
                let fid = next.add_point(*x, *y);
                let values = (0..var_count).map(|var| feature.field(var)).collect();
                (fid, PointEdit::Append { count: 1, values })
            }
            (LayerKind::Elements, geometry @ Geometry::Polygon(_)) => {
                let vertices = geometry.ring_vertices().unwrap_or_default();
                let ppe = next.points_per_element();
                if next.element_count() > 0 || ppe > 0 {
                    if vertices.len() != ppe {
                        return Err(Error::unsupported(format!(
                            "The new feature should have the same number of vertices {} as the existing ones in the layer",
                            ppe
                        )));
                    }
                } else if vertices.len() < 3 {
                    return Err(Error::unsupported("The new feature should have at least 3 vertices"));
                }

                let tolerance = match next.bounding_box() {
                    Some(bbox) => {
                        let d = bbox.width() / (next.point_count() as f64).sqrt() / 1000.0;
                        Some(d * d)
                    }
                    None => None,
                };

                let mut added = 0;
                let mut map = Vec::with_capacity(vertices.len());
                for &(x, y) in vertices {
                    let existing = tolerance.and_then(|t| next.closest_point(x, y, t));
                    map.push(match existing {
                        Some(point) => point,
                        None => {
                            added += 1;
                            next.add_point(x, y)
                        }
                    });
                }

                let fid = next.push_element(&map)?;
                let edit = if added > 0 {
                    PointEdit::Append { count: added, values: Vec::new() }
                } else {
                    PointEdit::None
                };
                (fid, edit)
            }
            (_, geometry) => return Err(self.wrong_geometry(geometry)),
        };

        let plan = RewritePlan::identity(var_count).with_points(edit);
        self.dataset.apply(next, plan)?;
        Ok(fid)
    }

    /// Overwrites a feature in place
    ///
    /// For points this updates coordinates and attributes. For elements only
    /// the vertex coordinates change; element attributes are derived.
    pub fn set_feature(&mut self, feature: &Feature) -> Result<()> {
        tracing::debug!(kind = ?self.kind, fid = feature.fid, "set_feature");
        self.dataset.require_update()?;

        let fid = feature.fid;
        let count = self.feature_count();
        if fid >= count {
            return Err(Error::out_of_bounds(format!("Feature {} of {}", fid, count)));
        }

        let mut next = self.dataset.header().clone();
        let layout = next.layout();

        match (self.kind, &feature.geometry) {
            (LayerKind::Points, Geometry::Point { x, y }) => {
                next.set_point(fid, *x, *y)?;
                self.dataset.write_point(&next, fid)?;
                for var in 0..next.variables().len() {
                    let position = layout.position(self.step, Some(fid), Some(var));
                    self.dataset.write_value(position, feature.field(var))?;
                }
            }
            (LayerKind::Elements, geometry @ Geometry::Polygon(_)) => {
                let vertices = geometry.ring_vertices().unwrap_or_default();
                if vertices.len() != next.points_per_element() {
                    return Err(Error::unsupported(format!(
                        "The new feature should have the same number of vertices {} as the existing ones in the layer",
                        next.points_per_element()
                    )));
                }
                if !feature.fields.is_empty() {
                    tracing::warn!("The attributes of elements layer in mesh-series files can't be updated");
                }

                let points = next.element(fid).unwrap_or_default();
                for (&point, &(x, y)) in points.iter().zip(vertices) {
                    next.set_point(point, x, y)?;
                    self.dataset.write_point(&next, point)?;
                }
            }
            (_, geometry) => return Err(self.wrong_geometry(geometry)),
        }

        self.dataset.flush()?;
        self.dataset.commit(next);
        Ok(())
    }

    /// Deletes a feature
    ///
    /// Deleting a point also deletes every element that uses it. Deleting an
    /// element keeps its points.
    pub fn delete_feature(&mut self, fid: usize) -> Result<()> {
        tracing::debug!(kind = ?self.kind, fid, "delete_feature");
        self.dataset.require_update()?;

        let mut next = self.dataset.header().clone();
        let var_count = next.variables().len();
        let edit = match self.kind {
            LayerKind::Points => {
                next.remove_point(fid)?;
                PointEdit::Remove(fid)
            }
            LayerKind::Elements => {
                next.remove_element(fid)?;
                PointEdit::None
            }
        };

        self.dataset.apply(next, RewritePlan::identity(var_count).with_points(edit))
    }
}

/// Iterator over the features of a layer
pub struct Features<'l, 'a> {
    layer: &'l mut Layer<'a>,
    next: usize,
    filter: Option<Extent>,
}

impl Features<'_, '_> {
    /// Skips features whose bounding box misses `extent`
    pub fn within(mut self, extent: Extent) -> Self {
        self.filter = Some(extent);
        self
    }
}

impl Iterator for Features<'_, '_> {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.layer.feature_count() {
            let feature = self.layer.feature(self.next);
            self.next += 1;
            match (&feature, &self.filter) {
                (Ok(found), Some(filter)) => {
                    if found.geometry.envelope().is_some_and(|env| env.intersects(filter)) {
                        return Some(feature);
                    }
                }
                _ => return Some(feature),
            }
        }
        None
    }
}
