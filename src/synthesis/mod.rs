//! # SynCOM blob-field synthesis
//!
//! This module defines the [`SyncomParams`] configuration record and its builder, and
//! hosts the stages of the synthesis pipeline:
//!
//! 1. **Gaussian kernels** ([`gaussian`]) – 1D/2D Gaussian intensity profiles with
//!    wrap-around placement on the angular axis.
//! 2. **Blob sampling** ([`blob`]) – stochastic launch radius, position angle, speed,
//!    period and size for every blob, sorted by decreasing speed and grouped into
//!    launch events.
//! 3. **Frame compositing** ([`compositor`]) – one frame per time step, each blob
//!    replicated at its recurrence offsets and advected along the radial axis.
//! 4. **Simulation driver** ([`driver`]) – iterates the compositor over a time range
//!    to build an [`ImageCube`](crate::image_cube::ImageCube).
//!
//! ## Example
//!
//! ```rust,no_run
//! use syncom::angular_field::{AngularField, AngularStatistics};
//! use syncom::frame_sink::NullSink;
//! use syncom::synthesis::{driver::Simulation, SyncomParams, VelocityProfile};
//!
//! let params = SyncomParams::builder()
//!     .n_blobs(200)
//!     .grid(720, 256)
//!     .velocity_profile(VelocityProfile::Sinusoidal {
//!         base_kms: 400.0,
//!         amplitude_kms: 100.0,
//!     })
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! let stats = AngularStatistics::new(AngularField::constant(400.0, 3600).unwrap(), None).unwrap();
//! let simulation = Simulation::new(params, &stats).unwrap();
//! let cube = simulation.run(0, 48, &mut NullSink).unwrap();
//! assert_eq!(cube.dims(), (720, 256, 48));
//! ```
use serde::{Deserialize, Serialize};
use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt;

use crate::constants::{
    km_per_pixel, Kilometer, Second, SolarRadius, DEFAULT_NX, DEFAULT_NY,
    DEFAULT_PIXEL_SIZE_RSUN, DEFAULT_TIME_CADENCE_S, SOLAR_RADIUS_KM,
};
use crate::syncom_errors::SyncomError;

pub mod blob;
pub mod compositor;
pub mod driver;
pub mod gaussian;

/// Source of the per-angle outflow speed used by the blob sampler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VelocityProfile {
    /// Read speeds from the externally supplied velocity field.
    Observed,
    /// Replace the observed field with `base + amplitude * cos(2π·angle/180)`.
    Sinusoidal { base_kms: f64, amplitude_kms: f64 },
}

/// Configuration of one synthesis run.
///
/// Fields
/// -----------------
/// **Blob population**
/// * `n_blobs` – number of blobs to sample.
/// * `initial_radius_rsun` – `Some(r)` launches every blob at `r` solar radii;
///   `None` draws launch radii uniformly over the radial extent of the grid.
/// * `blob_size_scale` – multiplier applied to the sampled blob sizes.
/// * `size_range_deg` – `(min, max)` of the uniform size draw before scaling.
/// * `velocity_profile` – observed field or synthetic sinusoid.
/// * `default_period_s` – period used when the angular dataset has no period field.
/// * `seed` – seed of the random generator, recorded for reproducibility.
///
/// **Grid / instrument**
/// * `nx`, `ny` – angular and radial pixel counts of a frame.
/// * `time_cadence_s` – seconds between frames.
/// * `pixel_size_rsun` – radial pixel size in solar radii.
/// * `solar_radius_km` – solar radius in km.
///
/// **Angular fields**
/// * `field_smoothing_bins` – boxcar width applied to the angular fields.
/// * `field_rotation_bins` – rotation from the dataset convention to the grid convention.
///
/// **Compositing**
/// * `recurrence_multiples` – the non-zero `k` at which each blob is replicated.
/// * `time_offset` – frames added to the simulation time of every blob.
/// * `acceleration_px_per_frame2` – radial acceleration, 0 for constant speed.
/// * `version_label` – key under which frames are handed to the sink.
///
/// Defaults
/// -----------------
/// * `n_blobs`: 1000
/// * `nx`, `ny`: 3600, 640
/// * `time_cadence_s`: 300 s
/// * `pixel_size_rsun`: 0.014
/// * `solar_radius_km`: 696000 km
/// * `initial_radius_rsun`: None
/// * `blob_size_scale`: 1.0, `size_range_deg`: (1.0, 5.0)
/// * `velocity_profile`: `Observed`
/// * `default_period_s`: 3600 s
/// * `field_smoothing_bins`: 15, `field_rotation_bins`: 0
/// * `recurrence_multiples`: [-4, -2, 2, 4]
/// * `time_offset`: 0.0, `acceleration_px_per_frame2`: 0.0
/// * `seed`: 42, `version_label`: "v1"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncomParams {
    // --- Blob population ---
    pub n_blobs: usize,
    pub initial_radius_rsun: Option<SolarRadius>,
    pub blob_size_scale: f64,
    pub size_range_deg: (f64, f64),
    pub velocity_profile: VelocityProfile,
    pub default_period_s: Second,
    pub seed: u64,

    // --- Grid / instrument ---
    pub nx: usize,
    pub ny: usize,
    pub time_cadence_s: Second,
    pub pixel_size_rsun: SolarRadius,
    pub solar_radius_km: Kilometer,

    // --- Angular fields ---
    pub field_smoothing_bins: usize,
    pub field_rotation_bins: isize,

    // --- Compositing ---
    pub recurrence_multiples: Vec<i32>,
    pub time_offset: f64,
    pub acceleration_px_per_frame2: f64,
    pub version_label: String,
}

impl SyncomParams {
    /// Equivalent to [`SyncomParams::default()`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Fluent builder starting from the defaults, validated by [`SyncomParamsBuilder::build`].
    pub fn builder() -> SyncomParamsBuilder {
        SyncomParamsBuilder::new()
    }

    /// Kilometers covered by one radial pixel.
    pub fn km_per_pixel(&self) -> Kilometer {
        km_per_pixel(self.solar_radius_km, self.pixel_size_rsun)
    }

    /// Launch radius in pixels when all blobs share one, `None` otherwise.
    pub fn initial_radius_px(&self) -> Option<f64> {
        self.initial_radius_rsun.map(|r| r / self.pixel_size_rsun)
    }

    /// Check every configuration rule.
    ///
    /// Validation rules
    /// -----------------
    /// * `n_blobs ≥ 1`, `nx ≥ 1`, `ny ≥ 1`.
    /// * `time_cadence_s`, `pixel_size_rsun`, `solar_radius_km`, `blob_size_scale`,
    ///   `default_period_s` strictly positive.
    /// * `0 < size_range_deg.0 ≤ size_range_deg.1`.
    /// * `initial_radius_rsun`, when set, non-negative.
    /// * `field_smoothing_bins ≥ 1`.
    /// * `recurrence_multiples` holds no zero (the base kernel is always drawn once).
    /// * `time_offset` and `acceleration_px_per_frame2` finite.
    /// * `Sinusoidal` profiles need a finite amplitude and a positive base.
    ///
    /// Return
    /// ----------
    /// * `Err(SyncomError::ConfigurationError)` naming the first rule that fails.
    pub fn validate(&self) -> Result<(), SyncomError> {
        let p = self;

        if p.n_blobs == 0 {
            return Err(SyncomError::ConfigurationError(
                "n_blobs must be >= 1".into(),
            ));
        }
        if p.nx == 0 || p.ny == 0 {
            return Err(SyncomError::ConfigurationError(
                "grid dimensions must be >= 1".into(),
            ));
        }

        // --- Strictly positive checks (> 0) ---
        if !gt0(p.time_cadence_s) {
            return Err(SyncomError::ConfigurationError(
                "time_cadence_s must be > 0".into(),
            ));
        }
        if !gt0(p.pixel_size_rsun) {
            return Err(SyncomError::ConfigurationError(
                "pixel_size_rsun must be > 0".into(),
            ));
        }
        if !gt0(p.solar_radius_km) {
            return Err(SyncomError::ConfigurationError(
                "solar_radius_km must be > 0".into(),
            ));
        }
        if !gt0(p.blob_size_scale) {
            return Err(SyncomError::ConfigurationError(
                "blob_size_scale must be > 0".into(),
            ));
        }
        if !gt0(p.default_period_s) {
            return Err(SyncomError::ConfigurationError(
                "default_period_s must be > 0".into(),
            ));
        }

        let (size_min, size_max) = p.size_range_deg;
        if !(gt0(size_min) && le(size_min, size_max)) {
            return Err(SyncomError::ConfigurationError(
                "require 0 < size_range_deg.0 <= size_range_deg.1".into(),
            ));
        }

        if let Some(r) = p.initial_radius_rsun {
            if !ge0(r) {
                return Err(SyncomError::ConfigurationError(
                    "initial_radius_rsun must be non-negative".into(),
                ));
            }
        }

        if p.field_smoothing_bins == 0 {
            return Err(SyncomError::ConfigurationError(
                "field_smoothing_bins must be >= 1".into(),
            ));
        }
        if p.recurrence_multiples.contains(&0) {
            return Err(SyncomError::ConfigurationError(
                "recurrence_multiples must not contain 0".into(),
            ));
        }
        if !p.time_offset.is_finite() || !p.acceleration_px_per_frame2.is_finite() {
            return Err(SyncomError::ConfigurationError(
                "time_offset and acceleration must be finite".into(),
            ));
        }

        if let VelocityProfile::Sinusoidal {
            base_kms,
            amplitude_kms,
        } = p.velocity_profile
        {
            if !gt0(base_kms) || !amplitude_kms.is_finite() {
                return Err(SyncomError::ConfigurationError(
                    "sinusoidal profile needs base_kms > 0 and a finite amplitude".into(),
                ));
            }
        }

        Ok(())
    }
}

impl Default for SyncomParams {
    fn default() -> Self {
        SyncomParams {
            n_blobs: 1000,
            initial_radius_rsun: None,
            blob_size_scale: 1.0,
            size_range_deg: (1.0, 5.0),
            velocity_profile: VelocityProfile::Observed,
            default_period_s: 3600.0,
            seed: 42,

            nx: DEFAULT_NX,
            ny: DEFAULT_NY,
            time_cadence_s: DEFAULT_TIME_CADENCE_S,
            pixel_size_rsun: DEFAULT_PIXEL_SIZE_RSUN,
            solar_radius_km: SOLAR_RADIUS_KM,

            field_smoothing_bins: 15,
            field_rotation_bins: 0,

            recurrence_multiples: vec![-4, -2, 2, 4],
            time_offset: 0.0,
            acceleration_px_per_frame2: 0.0,
            version_label: "v1".into(),
        }
    }
}

/// Return true iff x > 0.0 and comparable (i.e., not NaN).
#[inline]
fn gt0(x: f64) -> bool {
    x.partial_cmp(&0.0) == Some(Greater)
}

/// Return true iff x >= 0.0 and comparable (i.e., not NaN).
#[inline]
fn ge0(x: f64) -> bool {
    matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
}

/// Return true iff a <= b and comparable (i.e., not NaN).
#[inline]
fn le(a: f64, b: f64) -> bool {
    matches!(a.partial_cmp(&b), Some(Less) | Some(Equal))
}

/// Builder for [`SyncomParams`], with validation.
#[derive(Debug, Clone)]
pub struct SyncomParamsBuilder {
    params: SyncomParams,
}

impl Default for SyncomParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncomParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: SyncomParams::default(),
        }
    }

    // --- Blob population ---
    pub fn n_blobs(mut self, v: usize) -> Self {
        self.params.n_blobs = v;
        self
    }
    pub fn initial_radius_rsun(mut self, v: Option<SolarRadius>) -> Self {
        self.params.initial_radius_rsun = v;
        self
    }
    pub fn blob_size_scale(mut self, v: f64) -> Self {
        self.params.blob_size_scale = v;
        self
    }
    pub fn size_range_deg(mut self, min: f64, max: f64) -> Self {
        self.params.size_range_deg = (min, max);
        self
    }
    pub fn velocity_profile(mut self, v: VelocityProfile) -> Self {
        self.params.velocity_profile = v;
        self
    }
    pub fn default_period_s(mut self, v: Second) -> Self {
        self.params.default_period_s = v;
        self
    }
    pub fn seed(mut self, v: u64) -> Self {
        self.params.seed = v;
        self
    }

    // --- Grid / instrument ---
    pub fn grid(mut self, nx: usize, ny: usize) -> Self {
        self.params.nx = nx;
        self.params.ny = ny;
        self
    }
    pub fn time_cadence_s(mut self, v: Second) -> Self {
        self.params.time_cadence_s = v;
        self
    }
    pub fn pixel_size_rsun(mut self, v: SolarRadius) -> Self {
        self.params.pixel_size_rsun = v;
        self
    }
    pub fn solar_radius_km(mut self, v: Kilometer) -> Self {
        self.params.solar_radius_km = v;
        self
    }

    // --- Angular fields ---
    pub fn field_smoothing_bins(mut self, v: usize) -> Self {
        self.params.field_smoothing_bins = v;
        self
    }
    pub fn field_rotation_bins(mut self, v: isize) -> Self {
        self.params.field_rotation_bins = v;
        self
    }

    // --- Compositing ---
    pub fn recurrence_multiples(mut self, v: Vec<i32>) -> Self {
        self.params.recurrence_multiples = v;
        self
    }
    pub fn time_offset(mut self, v: f64) -> Self {
        self.params.time_offset = v;
        self
    }
    pub fn acceleration_px_per_frame2(mut self, v: f64) -> Self {
        self.params.acceleration_px_per_frame2 = v;
        self
    }
    pub fn version_label(mut self, v: impl Into<String>) -> Self {
        self.params.version_label = v.into();
        self
    }

    /// Finalize the builder and produce a [`SyncomParams`] instance.
    ///
    /// Return
    /// ----------
    /// * The parameters, or the error of [`SyncomParams::validate`].
    pub fn build(self) -> Result<SyncomParams, SyncomError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

impl fmt::Display for VelocityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VelocityProfile::Observed => write!(f, "observed"),
            VelocityProfile::Sinusoidal {
                base_kms,
                amplitude_kms,
            } => write!(f, "sinusoidal({base_kms:.1} ± {amplitude_kms:.1} km/s)"),
        }
    }
}

impl fmt::Display for SyncomParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 50;
            writeln!(f, "SynCOM Synthesis Parameters")?;
            writeln!(f, "---------------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Blob population]")?;
            line!("n_blobs              = {}", self.n_blobs, "Number of blobs")?;
            line!(
                "initial_radius_rsun  = {:?}",
                self.initial_radius_rsun,
                "Common launch radius (None = random)"
            )?;
            line!(
                "blob_size_scale      = {:.3}",
                self.blob_size_scale,
                "Multiplier on sampled sizes"
            )?;
            line!(
                "size_range_deg       = {:?}",
                self.size_range_deg,
                "Uniform size draw bounds"
            )?;
            line!(
                "velocity_profile     = {}",
                self.velocity_profile,
                "Source of per-angle speed"
            )?;
            line!(
                "default_period_s     = {:.1} s",
                self.default_period_s,
                "Period when the dataset has none"
            )?;
            line!("seed                 = {}", self.seed, "RNG seed")?;

            writeln!(f, "\n[Grid / instrument]")?;
            line!(
                "grid                 = {:?}",
                (self.nx, self.ny),
                "Angular x radial pixels"
            )?;
            line!(
                "time_cadence_s       = {:.1} s",
                self.time_cadence_s,
                "Time between frames"
            )?;
            line!(
                "pixel_size_rsun      = {:.4}",
                self.pixel_size_rsun,
                "Solar radii per radial pixel"
            )?;
            line!(
                "solar_radius_km      = {:.1} km",
                self.solar_radius_km,
                "Solar radius"
            )?;

            writeln!(f, "\n[Angular fields]")?;
            line!(
                "field_smoothing_bins = {}",
                self.field_smoothing_bins,
                "Boxcar width on angular fields"
            )?;
            line!(
                "field_rotation_bins  = {}",
                self.field_rotation_bins,
                "Rotation into grid convention"
            )?;

            writeln!(f, "\n[Compositing]")?;
            line!(
                "recurrence_multiples = {:?}",
                self.recurrence_multiples,
                "Replica multiples k"
            )?;
            line!(
                "time_offset          = {:.3}",
                self.time_offset,
                "Frames added to simulation time"
            )?;
            line!(
                "acceleration         = {:.3e}",
                self.acceleration_px_per_frame2,
                "Radial acceleration (px/frame^2)"
            )?;
            line!(
                "version_label        = {}",
                self.version_label,
                "Artifact key"
            )?;

            Ok(())
        } else {
            write!(
                f,
                "SyncomParams(n_blobs={}, grid={}x{}, cadence={:.1}s, pixel={:.4}Rsun, profile={}, seed={})",
                self.n_blobs,
                self.nx,
                self.ny,
                self.time_cadence_s,
                self.pixel_size_rsun,
                self.velocity_profile,
                self.seed,
            )
        }
    }
}
