//! Selafin mesh-series files
//!
//! A file holds a 2D mesh (points and elements sharing a fixed number of
//! vertices) followed by a sequence of time steps, each giving one value per
//! point for every variable. Each step is exposed as two layers: one of
//! points and one of elements.
//!
//! ```no_run
//! use rastermesh::config::SelafinConfig;
//! use rastermesh::formats::selafin::{LayerKind, SelafinDataset};
//!
//! let mut dataset = SelafinDataset::open("tide.slf", false, &SelafinConfig::default())?;
//! let mut layer = dataset.layer(0, LayerKind::Points)?;
//! for feature in layer.features() {
//!     println!("{:?}", feature?.fields);
//! }
//! # Ok::<(), rastermesh::Error>(())
//! ```

pub mod codec;
pub mod feature;
pub mod header;
pub mod layer;
pub mod layout;
pub mod rewrite;

#[cfg(test)]
pub(crate) mod testing;

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use crate::config::SelafinConfig;
use crate::error::{Error, Result};
use crate::io::BufferedReader;

pub use feature::{Feature, FieldDefn, FieldType, Geometry};
pub use header::Header;
pub use layer::{Capability, Layer, LayerKind};
pub use layout::{Axis, Layout};
pub use rewrite::{RewritePlan, ScratchStore, TempDirScratch};

use codec::NAME_LEN;
use rewrite::StepEdit;

/// An open mesh-series file
pub struct SelafinDataset {
    path: PathBuf,
    file: File,
    header: Header,
    update: bool,
    scratch: Box<dyn ScratchStore>,
}

impl SelafinDataset {
    /// Opens an existing file, for writing when `update` is set
    pub fn open<P: AsRef<Path>>(path: P, update: bool, config: &SelafinConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new().read(true).write(update).open(&path)?;
        let size = file.metadata()?.len();

        let header = {
            let mut reader = BufferedReader::new(&mut file);
            Header::read(&mut reader, size)?
        };

        Ok(Self {
            path,
            file,
            header,
            update,
            scratch: Box::new(TempDirScratch::new(config.temp_dir.clone())),
        })
    }

    /// Creates a file holding an empty mesh and no steps
    pub fn create<P: AsRef<Path>>(path: P, title: &str, config: &SelafinConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let header = Header::new(title);
        header.write(&mut file)?;
        file.flush()?;

        Ok(Self {
            path,
            file,
            header,
            update: true,
            scratch: Box::new(TempDirScratch::new(config.temp_dir.clone())),
        })
    }

    /// Replaces the store used for rewrite scratch files
    pub fn with_scratch(mut self, scratch: Box<dyn ScratchStore>) -> Self {
        self.scratch = scratch;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn title(&self) -> &str {
        self.header.title()
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn is_update(&self) -> bool {
        self.update
    }

    pub fn step_count(&self) -> usize {
        self.header.step_count()
    }

    fn check_step(&self, step: usize) -> Result<()> {
        if step >= self.step_count() {
            return Err(Error::out_of_bounds(format!(
                "Step {} of {}",
                step,
                self.step_count()
            )));
        }
        Ok(())
    }

    /// Time value stored at the start of a step
    pub fn step_date(&mut self, step: usize) -> Result<f64> {
        self.check_step(step)?;
        let position = self.header.layout().position(step, None, None);
        self.file.seek(SeekFrom::Start(position))?;
        self.header.codec().read_float(&mut self.file)
    }

    /// Layer name: file stem, `_p` or `_e`, then the step number
    pub fn layer_name(&self, step: usize, kind: LayerKind) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}_{}{}", stem, kind.suffix(), step)
    }

    /// Points or elements of one step
    pub fn layer(&mut self, step: usize, kind: LayerKind) -> Result<Layer<'_>> {
        self.check_step(step)?;
        Ok(Layer::new(self, step, kind))
    }

    /// Appends a step of zeros with the given time value
    pub fn add_time_step(&mut self, time: f64) -> Result<usize> {
        tracing::debug!(time, "add_time_step");
        self.require_update()?;
        let next = self.header.clone();
        let plan = RewritePlan::identity(next.variables().len()).with_steps(StepEdit::Append(time));
        self.apply(next, plan)?;
        Ok(self.step_count() - 1)
    }

    pub fn delete_time_step(&mut self, step: usize) -> Result<()> {
        tracing::debug!(step, "delete_time_step");
        self.require_update()?;
        self.check_step(step)?;
        let next = self.header.clone();
        let plan = RewritePlan::identity(next.variables().len()).with_steps(StepEdit::Remove(step));
        self.apply(next, plan)
    }

    pub(crate) fn require_update(&self) -> Result<()> {
        if !self.update {
            return Err(Error::unsupported(format!(
                "{} was opened read-only",
                self.path.display()
            )));
        }
        Ok(())
    }

    pub(crate) fn read_value(&mut self, position: u64) -> Result<f64> {
        self.file.seek(SeekFrom::Start(position))?;
        self.header.codec().read_raw_float(&mut self.file)
    }

    pub(crate) fn write_value(&mut self, position: u64, value: f64) -> Result<()> {
        self.file.seek(SeekFrom::Start(position))?;
        self.header.codec().write_raw_float(&mut self.file, value)
    }

    /// Writes the stored (origin-relative) coordinates of one point
    pub(crate) fn write_point(&mut self, header: &Header, point: usize) -> Result<()> {
        let layout = header.layout();
        let (x, y) = header
            .point(point)
            .ok_or_else(|| Error::out_of_bounds(format!("Point {}", point)))?;
        let (origin_x, origin_y) = header.origin();
        self.write_value(layout.coordinate_position(Axis::X, point), x - origin_x)?;
        self.write_value(layout.coordinate_position(Axis::Y, point), y - origin_y)
    }

    pub(crate) fn write_variable_name(&mut self, header: &Header, var: usize) -> Result<()> {
        let name = header
            .variables()
            .get(var)
            .ok_or_else(|| Error::out_of_bounds(format!("Variable {}", var)))?;
        self.file
            .seek(SeekFrom::Start(header.layout().variable_name_position(var)))?;
        header.codec().write_string(&mut self.file, name, NAME_LEN)?;
        self.flush()
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }

    pub(crate) fn commit(&mut self, header: Header) {
        self.header = header;
    }

    /// Regenerates the file for `next` and adopts it once the file matches
    ///
    /// On failure the file and the in-memory header are both left as they were.
    pub(crate) fn apply(&mut self, mut next: Header, plan: RewritePlan) -> Result<()> {
        let old = self.header.layout();
        let old_steps = self.header.step_count();
        let steps = match plan.steps {
            StepEdit::Keep => old_steps,
            StepEdit::Remove(_) => old_steps.saturating_sub(1),
            StepEdit::Append(_) => old_steps + 1,
        };
        next.set_step_count(steps);

        rewrite::regenerate(&mut self.file, old, old_steps, &next, &plan, self.scratch.as_ref())?;
        self.commit(next);
        Ok(())
    }
}
