//! # Frame compositing
//!
//! [`FrameCompositor`] renders one frame of the synthetic blob field at a given
//! simulation time. For every blob:
//!
//! 1. the base Gaussian kernel is drawn at `(angular pixel, launch radius)` with
//!    standard deviations `(size, 2·size)`;
//! 2. copies of the kernel are added, circularly shifted along the angular axis by
//!    `k·period·velocity + k·size` pixels for every `k` in the recurrence multiples,
//!    standing in for the earlier and later launches of the same blob;
//! 3. the composite is circularly shifted along the radial axis by the blob's
//!    current radius and accumulated into the frame.
//!
//! The frame is not normalized: overlapping blobs add up.
//!
//! The current radius of a blob at simulation time `t` is
//!
//! ```text
//! τ = t + time_offset − launch_time
//! r = τ·v + ½·a·τ²
//! ```
//!
//! with `a = 0` (the default) for blobs moving at constant speed.

use crate::image_cube::{add_shifted, pixel_shift, Frame};
use crate::synthesis::blob::BlobRecord;
use crate::synthesis::gaussian::gaussian_2d;
use crate::synthesis::SyncomParams;
use crate::syncom_errors::SyncomError;

/// Renders frames from a fixed blob population.
#[derive(Debug, Clone)]
pub struct FrameCompositor<'a> {
    blobs: &'a [BlobRecord],
    nx: usize,
    ny: usize,
    time_offset: f64,
    recurrence_multiples: Vec<i32>,
    acceleration: f64,
}

impl<'a> FrameCompositor<'a> {
    /// Compositor on an `(nx, ny)` grid with no time offset, no acceleration and
    /// the default recurrence multiples `{±2, ±4}`.
    ///
    /// Return
    /// ----------
    /// * `Err(SyncomError::ConfigurationError)` if a grid dimension is 0 or a blob
    ///   breaks a [`BlobRecord`] invariant.
    pub fn new(blobs: &'a [BlobRecord], nx: usize, ny: usize) -> Result<Self, SyncomError> {
        if nx == 0 || ny == 0 {
            return Err(SyncomError::ConfigurationError(format!(
                "grid dimensions must be >= 1, got {nx}x{ny}"
            )));
        }
        blobs.iter().try_for_each(BlobRecord::validate)?;

        Ok(FrameCompositor {
            blobs,
            nx,
            ny,
            time_offset: 0.0,
            recurrence_multiples: vec![-4, -2, 2, 4],
            acceleration: 0.0,
        })
    }

    /// Compositor configured from a validated [`SyncomParams`].
    pub fn from_params(
        blobs: &'a [BlobRecord],
        params: &SyncomParams,
    ) -> Result<Self, SyncomError> {
        Ok(FrameCompositor::new(blobs, params.nx, params.ny)?
            .with_time_offset(params.time_offset)
            .with_recurrence_multiples(params.recurrence_multiples.clone())
            .with_acceleration(params.acceleration_px_per_frame2))
    }

    pub fn with_time_offset(mut self, time_offset: f64) -> Self {
        self.time_offset = time_offset;
        self
    }

    /// Replace the recurrence multiples; zeros are dropped since the base kernel is always drawn.
    pub fn with_recurrence_multiples(mut self, multiples: Vec<i32>) -> Self {
        self.recurrence_multiples = multiples.into_iter().filter(|&k| k != 0).collect();
        self
    }

    pub fn with_acceleration(mut self, acceleration: f64) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub fn blobs(&self) -> &[BlobRecord] {
        self.blobs
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Radial displacement of `blob` at simulation time `t`, in pixels.
    pub fn current_radius(&self, blob: &BlobRecord, t: f64) -> f64 {
        let tau = t + self.time_offset - blob.launch_time;
        tau * blob.radial_velocity_px + 0.5 * self.acceleration * tau * tau
    }

    /// Angular displacement of the `k`-th recurrence copy of `blob`, in pixels.
    pub fn recurrence_shift(blob: &BlobRecord, k: i32) -> isize {
        let k = k as f64;
        pixel_shift(k * blob.period_s * blob.radial_velocity_px + k * blob.size_deg)
    }

    /// Base kernel of `blob` plus its recurrence copies, before radial advection.
    pub fn blob_kernel(&self, blob: &BlobRecord) -> Result<Frame, SyncomError> {
        let (sigma_x, sigma_y) = blob.sigma();
        let base = gaussian_2d(
            self.nx,
            self.ny,
            blob.angular_pixel(self.nx),
            blob.launch_radius_px,
            sigma_x,
            sigma_y,
        );

        let mut composite = base.clone();
        for &k in &self.recurrence_multiples {
            add_shifted(&mut composite, &base, Self::recurrence_shift(blob, k), 0)?;
        }
        Ok(composite)
    }

    /// Accumulate every blob, as seen at time `t`, into `frame`.
    pub fn render_into(&self, t: f64, frame: &mut Frame) -> Result<(), SyncomError> {
        if frame.shape() != (self.nx, self.ny) {
            return Err(SyncomError::ConfigurationError(format!(
                "frame shape {:?} does not match grid {:?}",
                frame.shape(),
                (self.nx, self.ny)
            )));
        }

        for blob in self.blobs {
            let kernel = self.blob_kernel(blob)?;
            let radial = pixel_shift(self.current_radius(blob, t));
            add_shifted(frame, &kernel, 0, radial)?;
        }
        Ok(())
    }

    /// Render the frame at simulation time `t`, starting from an all-zero frame.
    pub fn render(&self, t: f64) -> Result<Frame, SyncomError> {
        let mut frame = Frame::zeros(self.nx, self.ny);
        self.render_into(t, &mut frame)?;
        Ok(frame)
    }
}
