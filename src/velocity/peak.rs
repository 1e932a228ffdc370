//! # Correlation peak location and refinement
//!
//! The integer peak of a correlation curve is its first maximum. It can be refined
//! to a fractional position by fitting a polynomial, in the least-squares sense, to
//! the five samples centered on the peak and locating the maximum of the fitted
//! curve on a grid of step 0.01 spanning the same window.
//!
//! Refinement needs two samples on each side of the peak; a peak closer than that to
//! either end of the curve is left unrefined.

use nalgebra::{DMatrix, DVector};

use crate::constants::{PEAK_HALF_WINDOW, PEAK_REFINE_STEP};

/// Index of the first maximum of `values`, ignoring `NaN`.
///
/// Return
/// ----------
/// * `None` if `values` is empty or holds only `NaN`.
pub fn find_peak(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Least-squares polynomial fit `y ≈ Σ c_k x^k`, `k = 0..=order`.
///
/// Return
/// ----------
/// * The `order + 1` coefficients in increasing degree, or `None` if the system is
///   underdetermined (`order + 1 > x.len()`) or the lengths of `x` and `y` differ.
pub fn polyfit(x: &[f64], y: &[f64], order: usize) -> Option<DVector<f64>> {
    let n = x.len();
    if y.len() != n || order + 1 > n {
        return None;
    }
    let vandermonde = DMatrix::from_fn(n, order + 1, |i, k| x[i].powi(k as i32));
    let rhs = DVector::from_column_slice(y);

    vandermonde
        .svd(true, true)
        .solve(&rhs, f64::EPSILON)
        .ok()
}

/// Evaluate a polynomial given by increasing-degree coefficients (Horner scheme).
pub fn polyval(coeffs: &DVector<f64>, x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Fractional position of the maximum of `values` around the integer peak `peak`.
///
/// Arguments
/// -----------------
/// * `values`: correlation curve.
/// * `peak`: index of its integer maximum.
/// * `order`: order of the fitted polynomial.
///
/// Return
/// ----------
/// * `None` if `peak` is within two samples of either end of `values`: the caller
///   keeps the integer peak.
/// * `Some(NaN)` if the fit is degenerate (`order ≥ 5` or non-finite samples).
/// * `Some(p)` otherwise, with `p` in `[peak − 2, peak + 2]`.
pub fn refine_peak(values: &[f64], peak: usize, order: usize) -> Option<f64> {
    let half = PEAK_HALF_WINDOW;
    if peak < half || peak + half >= values.len() {
        return None;
    }

    let window = &values[peak - half..=peak + half];
    let offsets: Vec<f64> = (0..window.len())
        .map(|i| i as f64 - half as f64)
        .collect();

    let coeffs = match polyfit(&offsets, window, order) {
        Some(c) if c.iter().all(|v| v.is_finite()) => c,
        _ => return Some(f64::NAN),
    };

    let n_steps = (2.0 * half as f64 / PEAK_REFINE_STEP).round() as usize;
    let grid: Vec<f64> = (0..=n_steps)
        .map(|k| -(half as f64) + k as f64 * PEAK_REFINE_STEP)
        .collect();
    let fitted: Vec<f64> = grid.iter().map(|&x| polyval(&coeffs, x)).collect();

    find_peak(&fitted).map(|best| peak as f64 + grid[best])
}
