//! # Frames, image cubes and circular shifts
//!
//! A [`Frame`] is a dense polar image indexed by `(angular pixel, radial pixel)`.
//! The angular axis is periodic (position angle wraps at 360°), and the radial
//! axis is treated as periodic as well when blobs are advected, so every
//! displacement in this crate is a **circular shift** by a whole number of pixels.
//!
//! An [`ImageCube`] is the ordered sequence of frames produced by a simulation run,
//! or any observational distance–time stack fed to the velocity estimator.
//!
//! ## Shift convention
//!
//! A positive shift moves content toward higher indices: after
//! `shift_angular(&m, 3)`, the value at row `i` of the input is found at row
//! `(i + 3) mod nx` of the output.
//!
//! Fractional shift amounts are rounded to the nearest integer by
//! [`pixel_shift`] before being applied.

use nalgebra::DMatrix;

use crate::syncom_errors::SyncomError;

/// One synthetic (or observed) image: rows are angular pixels, columns are radial pixels.
pub type Frame = DMatrix<f64>;

/// Round a fractional displacement to the integer pixel shift actually applied.
#[inline]
pub fn pixel_shift(amount: f64) -> isize {
    amount.round() as isize
}

#[inline]
fn wrap(index: isize, len: usize) -> usize {
    index.rem_euclid(len as isize) as usize
}

/// Circularly shift a frame along the angular (row) axis.
pub fn shift_angular(frame: &Frame, shift: isize) -> Frame {
    let nx = frame.nrows();
    if nx == 0 {
        return frame.clone();
    }
    DMatrix::from_fn(nx, frame.ncols(), |i, j| {
        frame[(wrap(i as isize - shift, nx), j)]
    })
}

/// Circularly shift a frame along the radial (column) axis.
pub fn shift_radial(frame: &Frame, shift: isize) -> Frame {
    let ny = frame.ncols();
    if ny == 0 {
        return frame.clone();
    }
    DMatrix::from_fn(frame.nrows(), ny, |i, j| {
        frame[(i, wrap(j as isize - shift, ny))]
    })
}

/// Accumulate `source`, circularly shifted by `(angular, radial)` pixels, into `target`.
///
/// Equivalent to `target += shift_radial(&shift_angular(source, angular), radial)`
/// without allocating the intermediate frames.
///
/// Arguments
/// -----------------
/// * `target`: accumulator frame, mutated in place.
/// * `source`: frame to add.
/// * `angular`: shift along the angular axis, in pixels.
/// * `radial`: shift along the radial axis, in pixels.
///
/// Return
/// ----------
/// * `Err(SyncomError::ConfigurationError)` if the two frames do not share the same shape.
pub fn add_shifted(
    target: &mut Frame,
    source: &Frame,
    angular: isize,
    radial: isize,
) -> Result<(), SyncomError> {
    if target.shape() != source.shape() {
        return Err(SyncomError::ConfigurationError(format!(
            "cannot accumulate a {:?} frame into a {:?} frame",
            source.shape(),
            target.shape()
        )));
    }
    let (nx, ny) = source.shape();
    if nx == 0 || ny == 0 {
        return Ok(());
    }

    for j in 0..ny {
        let jj = wrap(j as isize + radial, ny);
        for i in 0..nx {
            let ii = wrap(i as isize + angular, nx);
            target[(ii, jj)] += source[(i, j)];
        }
    }
    Ok(())
}

/// Ordered stack of frames sharing the same `(nx, ny)` shape.
///
/// Frames are stored in simulation-time order; `time0` is the time step of
/// the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCube {
    nx: usize,
    ny: usize,
    time0: i64,
    frames: Vec<Frame>,
}

impl ImageCube {
    /// Create an empty cube for frames of shape `(nx, ny)` starting at time step `time0`.
    pub fn new(nx: usize, ny: usize, time0: i64) -> Self {
        ImageCube {
            nx,
            ny,
            time0,
            frames: Vec::new(),
        }
    }

    /// Create an empty cube with room for `capacity` frames.
    pub fn with_capacity(nx: usize, ny: usize, time0: i64, capacity: usize) -> Self {
        ImageCube {
            nx,
            ny,
            time0,
            frames: Vec::with_capacity(capacity),
        }
    }

    /// Build a cube from already rendered frames.
    ///
    /// Return
    /// ----------
    /// * `Err(SyncomError::ConfigurationError)` if the frames do not all share one shape.
    pub fn from_frames(frames: Vec<Frame>, time0: i64) -> Result<Self, SyncomError> {
        let (nx, ny) = frames.first().map(|f| f.shape()).unwrap_or((0, 0));
        let mut cube = ImageCube::with_capacity(nx, ny, time0, frames.len());
        for frame in frames {
            cube.push(frame)?;
        }
        Ok(cube)
    }

    /// Append the next frame in time order.
    pub fn push(&mut self, frame: Frame) -> Result<(), SyncomError> {
        if frame.shape() != (self.nx, self.ny) {
            return Err(SyncomError::ConfigurationError(format!(
                "frame shape {:?} does not match cube shape {:?}",
                frame.shape(),
                (self.nx, self.ny)
            )));
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Shape `(nx, ny, nt)` of the cube.
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.frames.len())
    }

    pub fn time0(&self) -> i64 {
        self.time0
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame at position `index` (0-based, relative to `time0`).
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    /// Single pixel value, or `None` if any index is outside the cube.
    pub fn value(&self, angle: usize, time: usize, radius: usize) -> Option<f64> {
        self.frames.get(time)?.get((angle, radius)).copied()
    }

    /// Distance–time map (time × radius) for one angular pixel.
    ///
    /// Return
    /// ----------
    /// * `Err(SyncomError::BoundsError)` if `angle >= nx`.
    pub fn distance_time(&self, angle: usize) -> Result<DMatrix<f64>, SyncomError> {
        if angle >= self.nx {
            return Err(SyncomError::BoundsError(format!(
                "angular index {angle} outside [0, {})",
                self.nx
            )));
        }
        Ok(DMatrix::from_fn(self.frames.len(), self.ny, |t, r| {
            self.frames[t][(angle, r)]
        }))
    }

    /// Time series of one pixel `(angle, radius)` across all frames.
    ///
    /// Return
    /// ----------
    /// * `Err(SyncomError::BoundsError)` if `angle >= nx` or `radius >= ny`.
    pub fn time_series(&self, angle: usize, radius: usize) -> Result<Vec<f64>, SyncomError> {
        if angle >= self.nx || radius >= self.ny {
            return Err(SyncomError::BoundsError(format!(
                "pixel ({angle}, {radius}) outside the {}x{} grid",
                self.nx, self.ny
            )));
        }
        Ok(self.frames.iter().map(|f| f[(angle, radius)]).collect())
    }

    /// One distance–time map per angular pixel, in angular order.
    pub fn distance_time_maps(&self) -> Vec<DMatrix<f64>> {
        (0..self.nx)
            .map(|angle| {
                DMatrix::from_fn(self.frames.len(), self.ny, |t, r| {
                    self.frames[t][(angle, r)]
                })
            })
            .collect()
    }
}
