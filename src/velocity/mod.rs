//! # Cross-correlation velocity extraction
//!
//! This module defines the [`VelocityParams`] configuration record and its builder,
//! and the stages of the velocity estimator:
//!
//! 1. **Correlation** ([`correlation`]) – optional moving-average detrending and the
//!    normalized lagged cross-correlation of two brightness time series.
//! 2. **Peak location** ([`peak`]) – integer peak of the correlation and its optional
//!    sub-sample refinement by a least-squares polynomial fit.
//! 3. **Estimator** ([`estimator`]) – extraction of the time series at two radial
//!    positions, lag → velocity conversion, one velocity per angular slice.
//!
//! ## Units
//!
//! Radial positions are given in solar radii and converted to radial pixels with
//! `pixels_per_rsun = 1 / pixel_size_rsun`. A peak lag `τ` (in frames) between
//! radii `r1` and `r2` gives
//!
//! ```text
//! v = (r2 − r1) · pixels_per_rsun · km_per_pixel / (τ · cadence)      [km/s]
//! km_per_pixel = solar_radius_km · pixel_size_rsun
//! ```
//!
//! A zero lag yields an infinite (or NaN) velocity; it is returned as is.
//!
//! ## Example
//!
//! ```rust,no_run
//! use syncom::velocity::{estimator::VelocityEstimator, VelocityParams};
//! # let cube: syncom::image_cube::ImageCube = unimplemented!();
//!
//! let params = VelocityParams::builder()
//!     .radii_rsun(3.0, 4.5)
//!     .max_lag(40)
//!     .detrend_time_scale(Some(12))
//!     .poly_order(Some(2))
//!     .build()
//!     .unwrap();
//!
//! let map = VelocityEstimator::new(params).estimate_cube(&cube).unwrap();
//! println!("median speed: {:?} km/s", map.median_finite());
//! ```
use serde::{Deserialize, Serialize};
use std::cmp::Ordering::{Equal, Greater};
use std::fmt;

use crate::constants::{
    km_per_pixel, Kilometer, Second, SolarRadius, DEFAULT_PIXEL_SIZE_RSUN,
    DEFAULT_TIME_CADENCE_S, SOLAR_RADIUS_KM,
};
use crate::syncom_errors::SyncomError;

pub mod correlation;
pub mod estimator;
pub mod peak;

/// Configuration of the cross-correlation velocity estimator.
///
/// Fields
/// -----------------
/// * `r1_rsun`, `r2_rsun` – radial positions (solar radii) of the two time series.
/// * `max_lag` – width `L` of the lag window; lags span `[-L/2, +L/2]`.
/// * `detrend_time_scale` – window (frames) of the moving average subtracted from
///   both series, `None` to correlate raw series.
/// * `poly_order` – order of the polynomial fitted around the correlation peak,
///   `None` to keep the integer peak.
/// * `time_cadence_s` – seconds between frames.
/// * `pixel_size_rsun` – radial pixel size in solar radii.
/// * `solar_radius_km` – solar radius in km.
/// * `radial_origin_rsun` – radius of radial pixel 0.
///
/// Defaults
/// -----------------
/// * `r1_rsun`: 3.0, `r2_rsun`: 4.5
/// * `max_lag`: 40
/// * `detrend_time_scale`: None, `poly_order`: None
/// * `time_cadence_s`: 300 s, `pixel_size_rsun`: 0.014, `solar_radius_km`: 696000 km
/// * `radial_origin_rsun`: 0.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityParams {
    pub r1_rsun: SolarRadius,
    pub r2_rsun: SolarRadius,
    pub max_lag: usize,
    pub detrend_time_scale: Option<usize>,
    pub poly_order: Option<usize>,
    pub time_cadence_s: Second,
    pub pixel_size_rsun: SolarRadius,
    pub solar_radius_km: Kilometer,
    pub radial_origin_rsun: SolarRadius,
}

impl VelocityParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> VelocityParamsBuilder {
        VelocityParamsBuilder::new()
    }

    /// Radial pixels per solar radius.
    pub fn pixels_per_rsun(&self) -> f64 {
        1.0 / self.pixel_size_rsun
    }

    /// Kilometers covered by one radial pixel.
    pub fn km_per_pixel(&self) -> Kilometer {
        km_per_pixel(self.solar_radius_km, self.pixel_size_rsun)
    }

    /// Radial pixel (possibly negative) closest to radius `r` (solar radii).
    pub fn radial_index(&self, r: SolarRadius) -> isize {
        ((r - self.radial_origin_rsun) * self.pixels_per_rsun()).round() as isize
    }

    /// Half width of the lag window, `L/2`.
    pub fn half_lag(&self) -> usize {
        self.max_lag / 2
    }
}

impl Default for VelocityParams {
    fn default() -> Self {
        VelocityParams {
            r1_rsun: 3.0,
            r2_rsun: 4.5,
            max_lag: 40,
            detrend_time_scale: None,
            poly_order: None,
            time_cadence_s: DEFAULT_TIME_CADENCE_S,
            pixel_size_rsun: DEFAULT_PIXEL_SIZE_RSUN,
            solar_radius_km: SOLAR_RADIUS_KM,
            radial_origin_rsun: 0.0,
        }
    }
}

/// Builder for [`VelocityParams`], with validation.
#[derive(Debug, Clone)]
pub struct VelocityParamsBuilder {
    params: VelocityParams,
}

impl Default for VelocityParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VelocityParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: VelocityParams::default(),
        }
    }

    pub fn radii_rsun(mut self, r1: SolarRadius, r2: SolarRadius) -> Self {
        self.params.r1_rsun = r1;
        self.params.r2_rsun = r2;
        self
    }
    pub fn max_lag(mut self, v: usize) -> Self {
        self.params.max_lag = v;
        self
    }
    pub fn detrend_time_scale(mut self, v: Option<usize>) -> Self {
        self.params.detrend_time_scale = v;
        self
    }
    pub fn poly_order(mut self, v: Option<usize>) -> Self {
        self.params.poly_order = v;
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
    pub fn radial_origin_rsun(mut self, v: SolarRadius) -> Self {
        self.params.radial_origin_rsun = v;
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff a >= b and comparable (i.e., not NaN).
    #[inline]
    fn ge(a: f64, b: f64) -> bool {
        matches!(a.partial_cmp(&b), Some(Greater) | Some(Equal))
    }

    /// Finalize the builder and produce a [`VelocityParams`] instance.
    ///
    /// Validation rules
    /// -----------------
    /// * `time_cadence_s`, `pixel_size_rsun`, `solar_radius_km` strictly positive.
    /// * `radial_origin_rsun` finite, `r1_rsun` and `r2_rsun` finite and not below it.
    /// * `max_lag ≥ 2`.
    /// * `detrend_time_scale ≥ 1` and `poly_order ≥ 1` when set.
    ///
    /// Radii beyond the data volume are only detected at estimation time, as a
    /// [`SyncomError::BoundsError`].
    pub fn build(self) -> Result<VelocityParams, SyncomError> {
        let p = &self.params;

        if !Self::gt0(p.time_cadence_s) {
            return Err(SyncomError::ConfigurationError(
                "time_cadence_s must be > 0".into(),
            ));
        }
        if !Self::gt0(p.pixel_size_rsun) {
            return Err(SyncomError::ConfigurationError(
                "pixel_size_rsun must be > 0".into(),
            ));
        }
        if !Self::gt0(p.solar_radius_km) {
            return Err(SyncomError::ConfigurationError(
                "solar_radius_km must be > 0".into(),
            ));
        }
        if !p.radial_origin_rsun.is_finite() {
            return Err(SyncomError::ConfigurationError(
                "radial_origin_rsun must be finite".into(),
            ));
        }
        if !(p.r1_rsun.is_finite() && p.r2_rsun.is_finite())
            || !Self::ge(p.r1_rsun, p.radial_origin_rsun)
            || !Self::ge(p.r2_rsun, p.radial_origin_rsun)
        {
            return Err(SyncomError::ConfigurationError(
                "r1_rsun and r2_rsun must be finite and >= radial_origin_rsun".into(),
            ));
        }
        if p.max_lag < 2 {
            return Err(SyncomError::ConfigurationError(
                "max_lag must be >= 2".into(),
            ));
        }
        if p.detrend_time_scale == Some(0) {
            return Err(SyncomError::ConfigurationError(
                "detrend_time_scale must be >= 1".into(),
            ));
        }
        if p.poly_order == Some(0) {
            return Err(SyncomError::ConfigurationError(
                "poly_order must be >= 1".into(),
            ));
        }

        Ok(self.params)
    }
}

impl fmt::Display for VelocityParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VelocityParams(r={:.3}→{:.3}Rsun, max_lag={}, detrend={:?}, poly_order={:?}, cadence={:.1}s, pixel={:.4}Rsun)",
            self.r1_rsun,
            self.r2_rsun,
            self.max_lag,
            self.detrend_time_scale,
            self.poly_order,
            self.time_cadence_s,
            self.pixel_size_rsun,
        )
    }
}
