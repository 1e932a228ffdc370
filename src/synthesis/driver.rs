//! # Simulation driver
//!
//! [`Simulation`] owns the configuration of a run and its blob population. The
//! population is sampled once, from a generator seeded with
//! [`SyncomParams::seed`], and is read-only afterwards. [`Simulation::run`] renders
//! the frames of a time range in order, hands each one to a
//! [`FrameSink`](crate::frame_sink::FrameSink), and returns the assembled
//! [`ImageCube`].
//!
//! With the `progress` feature enabled, `run` shows an `indicatif` progress bar.

#[cfg(feature = "progress")]
use std::time::Duration;

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::angular_field::AngularStatistics;
use crate::frame_sink::FrameSink;
use crate::image_cube::{Frame, ImageCube};
use crate::synthesis::blob::{BlobParameterSampler, BlobRecord};
use crate::synthesis::compositor::FrameCompositor;
use crate::synthesis::SyncomParams;
use crate::syncom_errors::SyncomError;

/// A configured synthesis run with its sampled blob population.
#[derive(Debug, Clone)]
pub struct Simulation {
    params: SyncomParams,
    blobs: Vec<BlobRecord>,
}

impl Simulation {
    /// Prepare the angular fields and sample the blob population.
    ///
    /// The fields of `stats` are smoothed over `field_smoothing_bins` and rotated by
    /// `field_rotation_bins` before sampling.
    ///
    /// Arguments
    /// -----------------
    /// * `params`: run configuration (see [`SyncomParams::builder`]).
    /// * `stats`: per-angle speed and (optional) period fields.
    ///
    /// Return
    /// ----------
    /// * The simulation, or the [`SyncomError`] raised by the sampler.
    pub fn new(params: SyncomParams, stats: &AngularStatistics) -> Result<Self, SyncomError> {
        let prepared = stats.prepare(params.field_smoothing_bins, params.field_rotation_bins);
        let sampler = BlobParameterSampler::new(&params, &prepared)?;

        let mut rng = StdRng::seed_from_u64(params.seed);
        let blobs = sampler.sample(&mut rng)?;

        info!(
            "sampled {} blobs (seed {}), {} launch events, speeds {:.1}..{:.1} km/s",
            blobs.len(),
            params.seed,
            blobs.last().map_or(0.0, |b| b.launch_time + 1.0),
            blobs.last().map_or(0.0, |b| b.radial_velocity_kms),
            blobs.first().map_or(0.0, |b| b.radial_velocity_kms),
        );

        Ok(Simulation { params, blobs })
    }

    /// Use an externally built blob population instead of sampling one.
    pub fn with_blobs(params: SyncomParams, blobs: Vec<BlobRecord>) -> Result<Self, SyncomError> {
        params.validate()?;
        blobs.iter().try_for_each(BlobRecord::validate)?;
        Ok(Simulation { params, blobs })
    }

    pub fn params(&self) -> &SyncomParams {
        &self.params
    }

    pub fn blobs(&self) -> &[BlobRecord] {
        &self.blobs
    }

    /// Compositor rendering this run's population with this run's settings.
    pub fn compositor(&self) -> Result<FrameCompositor<'_>, SyncomError> {
        FrameCompositor::from_params(&self.blobs, &self.params)
    }

    /// Render the single frame of time step `t`.
    pub fn render_frame(&self, t: i64) -> Result<Frame, SyncomError> {
        self.compositor()?.render(t as f64)
    }

    /// Render every time step of `[time0, time_t)` in order.
    ///
    /// Each frame is handed to `sink` under `params.version_label` and its time
    /// step; the finished cube is handed over once at the end.
    ///
    /// Return
    /// ----------
    /// * An [`ImageCube`] of shape `(nx, ny, time_t - time0)`.
    /// * `Err(SyncomError::ConfigurationError)` if `time_t < time0`; compositing and
    ///   sink errors are propagated and abort the run.
    pub fn run(
        &self,
        time0: i64,
        time_t: i64,
        sink: &mut impl FrameSink,
    ) -> Result<ImageCube, SyncomError> {
        if time_t < time0 {
            return Err(SyncomError::ConfigurationError(format!(
                "empty time range: time_t ({time_t}) < time0 ({time0})"
            )));
        }
        let n_frames = (time_t - time0) as usize;
        let compositor = self.compositor()?;
        let label = self.params.version_label.as_str();

        info!(
            "rendering {} frames [{}, {}) on a {}x{} grid, {} blobs",
            n_frames,
            time0,
            time_t,
            self.params.nx,
            self.params.ny,
            self.blobs.len()
        );

        #[cfg(feature = "progress")]
        let pb = {
            let pb = ProgressBar::new(n_frames.max(1) as u64);
            pb.set_style(
                ProgressStyle::with_template(
                    "{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | {per_sec} | ETA {eta_precise}",
                )
                .expect("indicatif template"),
            );
            pb.enable_steady_tick(Duration::from_millis(200));
            pb
        };

        let mut cube = ImageCube::with_capacity(self.params.nx, self.params.ny, time0, n_frames);
        for t in time0..time_t {
            let frame = compositor.render(t as f64)?;
            debug!("frame {t}: total intensity {:.3e}", frame.sum());

            sink.write_frame(label, t, &frame)?;
            cube.push(frame)?;

            #[cfg(feature = "progress")]
            pb.inc(1);
        }

        #[cfg(feature = "progress")]
        pb.finish_and_clear();

        sink.write_cube(label, &cube)?;
        info!("run '{label}' finished: cube {:?}", cube.dims());
        Ok(cube)
    }
}
