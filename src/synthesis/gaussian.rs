//! # Gaussian intensity kernels
//!
//! A blob is drawn as a separable 2D Gaussian on the polar grid. The angular
//! profile is first evaluated centered on the middle of the grid (`nx/2`) and then
//! circularly shifted to the requested position angle, so a blob sitting near 0°
//! spills over onto the last angular pixels instead of being truncated.
//!
//! The angular placement is done by a whole-pixel shift: a fractional angular mean
//! is rounded to the nearest pixel, while the radial profile keeps its exact
//! (possibly fractional) mean.
//!
//! ## Preconditions
//!
//! Standard deviations must be strictly positive and finite. The kernels are not
//! defined otherwise; callers validate sizes before rendering (see
//! [`BlobRecord::validate`](crate::synthesis::blob::BlobRecord::validate)).

use nalgebra::DVector;

use crate::image_cube::{pixel_shift, shift_angular, Frame};

/// Evaluate `exp(-(x - mean)² / (2σ²))` for `x = 0..nx-1`.
///
/// Arguments
/// -----------------
/// * `nx`: number of samples.
/// * `mean`: position of the peak, in samples.
/// * `sigma`: standard deviation, in samples (`> 0`).
///
/// Return
/// ----------
/// * A vector of `nx` values in `(0, 1]`, equal to 1 at `x = mean`.
pub fn gaussian_1d(nx: usize, mean: f64, sigma: f64) -> DVector<f64> {
    debug_assert!(sigma > 0.0, "gaussian_1d requires sigma > 0, got {sigma}");
    let two_var = 2.0 * sigma * sigma;
    DVector::from_fn(nx, |x, _| {
        let d = x as f64 - mean;
        (-d * d / two_var).exp()
    })
}

/// Separable 2D Gaussian on an `(nx, ny)` polar grid.
///
/// The radial (`y`) profile is evaluated directly at `mean_y`. The angular (`x`)
/// profile is evaluated at `nx/2`; the outer product is then circularly shifted
/// along the angular axis by `round(mean_x - nx/2)` pixels.
///
/// Arguments
/// -----------------
/// * `nx`, `ny`: angular and radial pixel counts.
/// * `mean_x`: angular position of the peak, in pixels.
/// * `mean_y`: radial position of the peak, in pixels.
/// * `sigma_x`, `sigma_y`: standard deviations along each axis (`> 0`).
///
/// Return
/// ----------
/// * A `(nx, ny)` frame whose maximum sits at `(round(mean_x) mod nx, mean_y)`.
pub fn gaussian_2d(
    nx: usize,
    ny: usize,
    mean_x: f64,
    mean_y: f64,
    sigma_x: f64,
    sigma_y: f64,
) -> Frame {
    let center = (nx / 2) as f64;
    let gx = gaussian_1d(nx, center, sigma_x);
    let gy = gaussian_1d(ny, mean_y, sigma_y);

    let kernel = &gx * gy.transpose();
    shift_angular(&kernel, pixel_shift(mean_x - center))
}
