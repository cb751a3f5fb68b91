//! Whole-file regeneration of mesh-series files
//!
//! Points, elements, variables and steps are interleaved at fixed offsets,
//! so structural edits rewrite the file. The new content is streamed into a
//! scratch file; the live file is only overwritten once every step has been
//! transcoded, and the scratch file is deleted on every path.

use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use crate::error::{Error, Result};
use crate::io::RecordStream;
use super::header::Header;
use super::layout::Layout;

/// Where each variable of the rewritten file takes its values from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSource {
    /// Copy the variable at this index in the old file
    Existing(usize),
    /// A new variable, zero everywhere
    Zeros,
}

/// Change to the per-step point arrays
#[derive(Debug, Clone, PartialEq)]
pub enum PointEdit {
    None,
    /// Append `count` points; `values[var]` fills them (zero when missing)
    Append { count: usize, values: Vec<f64> },
    /// Drop the point at this index
    Remove(usize),
}

/// Change to the sequence of steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepEdit {
    Keep,
    /// Drop the step at this index
    Remove(usize),
    /// Append a zero-filled step with this time value
    Append(f64),
}

/// Everything a regeneration needs to know besides the new header
#[derive(Debug, Clone, PartialEq)]
pub struct RewritePlan {
    pub variables: Vec<VariableSource>,
    pub points: PointEdit,
    pub steps: StepEdit,
}

impl RewritePlan {
    /// Copies every variable unchanged
    pub fn identity(variable_count: usize) -> Self {
        Self {
            variables: (0..variable_count).map(VariableSource::Existing).collect(),
            points: PointEdit::None,
            steps: StepEdit::Keep,
        }
    }

    pub fn with_points(mut self, points: PointEdit) -> Self {
        self.points = points;
        self
    }

    pub fn with_steps(mut self, steps: StepEdit) -> Self {
        self.steps = steps;
        self
    }

    fn apply_points(&self, var: usize, values: &mut Vec<f64>) {
        match &self.points {
            PointEdit::None => {}
            PointEdit::Append { count, values: fill } => {
                let fill = fill.get(var).copied().unwrap_or(0.0);
                values.extend(std::iter::repeat(fill).take(*count));
            }
            PointEdit::Remove(index) => {
                values.remove(*index);
            }
        }
    }
}

/// Creates scratch files for regeneration
pub trait ScratchStore {
    /// Creates an empty scratch file that is deleted when dropped
    fn create(&self) -> io::Result<Box<dyn RecordStream>>;
}

/// Scratch files from `tempfile`, in a given directory or the system one
#[derive(Debug, Clone, Default)]
pub struct TempDirScratch {
    dir: Option<PathBuf>,
}

impl TempDirScratch {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }
}

impl ScratchStore for TempDirScratch {
    fn create(&self) -> io::Result<Box<dyn RecordStream>> {
        let file = match &self.dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        Ok(Box::new(file))
    }
}

/// Rewrites `live` so that it matches `header`
///
/// `old` is the layout of the file as it currently is on disk, and `plan`
/// says how old steps and variables map onto the new ones. On error the live
/// file is untouched.
pub fn regenerate(
    live: &mut dyn RecordStream,
    old: Layout,
    old_steps: usize,
    header: &Header,
    plan: &RewritePlan,
    scratch: &dyn ScratchStore,
) -> Result<()> {
    if plan.variables.len() != header.variables().len() {
        return Err(Error::Rewrite(format!(
            "Plan has {} variables, header has {}",
            plan.variables.len(),
            header.variables().len()
        )));
    }

    let mut temp = scratch
        .create()
        .map_err(|e| Error::Rewrite(format!("Failed to create scratch file: {}", e)))?;

    transcode(live, old, old_steps, header, plan, temp.as_mut())
        .map_err(|e| Error::Rewrite(e.to_string()))?;

    temp.seek(SeekFrom::Start(0))?;
    live.seek(SeekFrom::Start(0))?;
    live.set_len(0)?;
    io::copy(temp.as_mut(), &mut *live)?;
    live.flush()?;

    tracing::debug!(steps = header.step_count(), "Regenerated mesh-series file");
    Ok(())
}

fn transcode(
    live: &mut dyn RecordStream,
    old: Layout,
    old_steps: usize,
    header: &Header,
    plan: &RewritePlan,
    temp: &mut dyn RecordStream,
) -> Result<()> {
    let codec = header.codec();
    let point_count = header.point_count();
    let limit = old.step_size();
    let mut out = BufWriter::new(temp);

    header.write(&mut out)?;

    for step in 0..old_steps {
        if plan.steps == StepEdit::Remove(step) {
            continue;
        }

        live.seek(SeekFrom::Start(old.position(step, None, None)))?;
        let time = codec.read_float(live)?;
        codec.write_float(&mut out, time)?;

        for (var, source) in plan.variables.iter().enumerate() {
            let values = match *source {
                VariableSource::Existing(old_var) => {
                    live.seek(SeekFrom::Start(old.position(step, None, Some(old_var))))?;
                    let mut values = codec.read_floats(live, limit)?;
                    if values.len() as u64 != old.points {
                        return Err(Error::invalid_format(format!(
                            "Step {} variable {} holds {} values for {} points",
                            step,
                            old_var,
                            values.len(),
                            old.points
                        )));
                    }
                    plan.apply_points(var, &mut values);
                    values
                }
                VariableSource::Zeros => vec![0.0; point_count],
            };
            codec.write_floats(&mut out, &values)?;
        }
    }

    if let StepEdit::Append(time) = plan.steps {
        codec.write_float(&mut out, time)?;
        let zeros = vec![0.0; point_count];
        for _ in &plan.variables {
            codec.write_floats(&mut out, &zeros)?;
        }
    }

    out.flush()?;
    Ok(())
}
