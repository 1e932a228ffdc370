//! # Constants and type definitions for SynCOM
//!
//! This module centralizes the **physical constants**, **default instrument values**, and
//! **unit type aliases** shared by the synthesis engine and the velocity estimator.
//!
//! ## Overview
//!
//! - Solar and instrument constants (solar radius, pixel scale, cadence)
//! - Angular resolution of the position-angle fields (tenths of a degree)
//! - Type aliases naming the unit carried by a raw `f64`
//!
//! These values are the documented defaults of
//! [`SyncomParams`](crate::synthesis::SyncomParams) and
//! [`VelocityParams`](crate::velocity::VelocityParams).

// -------------------------------------------------------------------------------------------------
// Physical constants and instrument defaults
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Solar radius in kilometers
pub const SOLAR_RADIUS_KM: f64 = 696_000.0;

/// Default pixel size of the polar grid, in solar radii per radial pixel
pub const DEFAULT_PIXEL_SIZE_RSUN: f64 = 0.014;

/// Default time between two frames, in seconds
pub const DEFAULT_TIME_CADENCE_S: f64 = 300.0;

/// Number of samples of a position-angle field (0.1° steps over 360°)
pub const N_ANGULAR_BINS: usize = 3600;

/// Number of angular bins per degree
pub const BINS_PER_DEGREE: f64 = N_ANGULAR_BINS as f64 / 360.0;

/// Default angular resolution of a synthetic frame (one pixel per angular bin)
pub const DEFAULT_NX: usize = N_ANGULAR_BINS;

/// Default radial resolution of a synthetic frame
pub const DEFAULT_NY: usize = 640;

/// Step of the fine lag grid used when refining a correlation peak
pub const PEAK_REFINE_STEP: f64 = 0.01;

/// Half width (in lags) of the window fitted around a correlation peak
pub const PEAK_HALF_WINDOW: usize = 2;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Position angle in tenths of a degree (index into an angular field)
pub type DegTenths = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Distance in solar radii
pub type SolarRadius = f64;
/// Distance in pixels
pub type Pixel = f64;
/// Duration in seconds
pub type Second = f64;
/// Speed in kilometers per second
pub type KmPerSecond = f64;
/// Speed in pixels per frame
pub type PixelPerFrame = f64;

/// Kilometers covered by one radial pixel.
#[inline]
pub fn km_per_pixel(solar_radius_km: Kilometer, pixel_size_rsun: SolarRadius) -> Kilometer {
    solar_radius_km * pixel_size_rsun
}

/// Convert a physical speed into the grid's native unit (pixels per frame).
///
/// Arguments
/// -----------------
/// * `speed`: radial speed in km/s.
/// * `cadence`: time between frames in seconds.
/// * `km_per_px`: kilometers covered by one radial pixel.
///
/// Return
/// ----------
/// * The speed expressed in pixels per frame.
#[inline]
pub fn kms_to_px_per_frame(
    speed: KmPerSecond,
    cadence: Second,
    km_per_px: Kilometer,
) -> PixelPerFrame {
    speed * cadence / km_per_px
}
