//! # Frame sinks
//!
//! The simulation hands every rendered frame, and the finished cube, to a
//! [`FrameSink`] keyed by the run's version label and the frame's time step.
//! Scientific image formats are out of scope; the crate ships a sink that drops
//! everything ([`NullSink`]), one that keeps frames in memory ([`MemorySink`])
//! and a plain-text writer ([`CsvFrameSink`]).

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;

use crate::image_cube::{Frame, ImageCube};
use crate::syncom_errors::SyncomError;

/// Destination of rendered frames.
pub trait FrameSink {
    /// Receive the frame rendered at time step `index` of the run labelled `label`.
    fn write_frame(&mut self, label: &str, index: i64, frame: &Frame) -> Result<(), SyncomError>;

    /// Receive the complete cube at the end of a run.
    fn write_cube(&mut self, _label: &str, _cube: &ImageCube) -> Result<(), SyncomError> {
        Ok(())
    }
}

/// Sink discarding everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn write_frame(
        &mut self,
        _label: &str,
        _index: i64,
        _frame: &Frame,
    ) -> Result<(), SyncomError> {
        Ok(())
    }
}

/// Sink keeping a copy of every frame, mostly useful in tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub frames: Vec<(String, i64, Frame)>,
    pub cubes: usize,
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, label: &str, index: i64, frame: &Frame) -> Result<(), SyncomError> {
        self.frames.push((label.to_string(), index, frame.clone()));
        Ok(())
    }

    fn write_cube(&mut self, _label: &str, _cube: &ImageCube) -> Result<(), SyncomError> {
        self.cubes += 1;
        Ok(())
    }
}

/// Writes each frame to `<dir>/<label>_<index>.csv`, one row per angular pixel.
#[derive(Debug, Clone)]
pub struct CsvFrameSink {
    dir: Utf8PathBuf,
}

impl CsvFrameSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: &Utf8Path) -> Result<Self, SyncomError> {
        std::fs::create_dir_all(dir)?;
        Ok(CsvFrameSink {
            dir: dir.to_path_buf(),
        })
    }

    /// File receiving the frame of time step `index`.
    pub fn path_for(&self, label: &str, index: i64) -> Utf8PathBuf {
        self.dir.join(format!("{label}_{index:05}.csv"))
    }
}

impl FrameSink for CsvFrameSink {
    fn write_frame(&mut self, label: &str, index: i64, frame: &Frame) -> Result<(), SyncomError> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(self.path_for(label, index))?;
        for row in frame.row_iter() {
            wtr.serialize(row.iter().copied().collect_vec())?;
        }
        wtr.flush()?;
        Ok(())
    }
}
