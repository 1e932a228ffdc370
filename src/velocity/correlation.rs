//! # Detrending and lagged cross-correlation
//!
//! The normalized cross-correlation of two series `x`, `y` of length `N` at lag `L` is
//!
//! ```text
//!            Σ_{k=0}^{N-|L|-1} (x_k − x̄)(y_{k+L} − ȳ)            L ≥ 0
//! P_xy(L) = ───────────────────────────────────────────
//!                  sqrt( Σ (x_k − x̄)² · Σ (y_k − ȳ)² )
//! ```
//!
//! and, for `L < 0`, the numerator pairs `x_{k+|L|}` with `y_k`. A positive peak lag
//! therefore means that `y` repeats `x` later in time.
//!
//! A constant series has zero variance; its correlation is `NaN` and is returned as is.

use crate::syncom_errors::SyncomError;

/// Centered moving average whose window shrinks at the series edges.
///
/// The window covers `[i - w/2, i - w/2 + w - 1]`, clipped to `[0, N)`; the average is
/// taken over the samples actually covered.
pub fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    let n = series.len();
    if window <= 1 || n == 0 {
        return series.to_vec();
    }
    let half = window / 2;

    // prefix sums: prefix[k] = Σ series[..k]
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &x in series {
        acc += x;
        prefix.push(acc);
    }

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + window - half).min(n);
            (prefix[hi] - prefix[lo]) / (hi - lo) as f64
        })
        .collect()
}

/// Remove the moving-average trend of width `time_scale` from `series`.
pub fn detrend(series: &[f64], time_scale: usize) -> Vec<f64> {
    series
        .iter()
        .zip(moving_average(series, time_scale))
        .map(|(x, trend)| x - trend)
        .collect()
}

/// Integer lags `[-L/2, +L/2]` for a lag window of width `max_lag`.
pub fn lag_range(max_lag: usize) -> Vec<isize> {
    let half = (max_lag / 2) as isize;
    (-half..=half).collect()
}

fn mean(series: &[f64]) -> f64 {
    series.iter().sum::<f64>() / series.len() as f64
}

/// Normalized cross-correlation of `x` and `y` at every lag of `lags`.
///
/// Arguments
/// -----------------
/// * `x`, `y`: series of equal length.
/// * `lags`: lags at which the correlation is evaluated.
///
/// Return
/// ----------
/// * One correlation value per lag, in `[-1, 1]` (or `NaN` for a constant series).
/// * `Err(SyncomError::BoundsError)` if the series differ in length, are shorter than
///   two samples, or a lag is not strictly shorter than the series.
pub fn cross_correlate(x: &[f64], y: &[f64], lags: &[isize]) -> Result<Vec<f64>, SyncomError> {
    let n = x.len();
    if y.len() != n {
        return Err(SyncomError::BoundsError(format!(
            "series lengths differ: {} vs {}",
            n,
            y.len()
        )));
    }
    if n < 2 {
        return Err(SyncomError::BoundsError(format!(
            "series of length {n} are too short to correlate"
        )));
    }
    if let Some(&bad) = lags.iter().find(|l| l.unsigned_abs() >= n) {
        return Err(SyncomError::BoundsError(format!(
            "lag {bad} exceeds series length {n}"
        )));
    }

    let (xm, ym) = (mean(x), mean(y));
    let dx: Vec<f64> = x.iter().map(|v| v - xm).collect();
    let dy: Vec<f64> = y.iter().map(|v| v - ym).collect();
    let sxx: f64 = dx.iter().map(|v| v * v).sum();
    let syy: f64 = dy.iter().map(|v| v * v).sum();
    let norm = (sxx * syy).sqrt();

    Ok(lags
        .iter()
        .map(|&lag| {
            let shift = lag.unsigned_abs();
            let sum: f64 = if lag >= 0 {
                dx[..n - shift].iter().zip(&dy[shift..]).map(|(a, b)| a * b).sum()
            } else {
                dx[shift..].iter().zip(&dy[..n - shift]).map(|(a, b)| a * b).sum()
            };
            sum / norm
        })
        .collect())
}

#[cfg(test)]
mod correlation_test {
    use super::*;
    use approx::assert_relative_eq;

    fn pulse(n: usize, center: f64, width: f64) -> Vec<f64> {
        (0..n)
            .map(|t| (-(t as f64 - center).powi(2) / (2.0 * width * width)).exp())
            .collect()
    }

    #[test]
    fn test_moving_average_shrinks_at_edges() {
        let s = [1.0, 2.0, 3.0, 4.0, 5.0];
        let m = moving_average(&s, 3);
        assert_relative_eq!(m[0], 1.5);
        assert_relative_eq!(m[1], 2.0);
        assert_relative_eq!(m[2], 3.0);
        assert_relative_eq!(m[4], 4.5);

        // even window: [i-2, i+1]
        let m = moving_average(&s, 4);
        assert_relative_eq!(m[0], 1.5);
        assert_relative_eq!(m[2], 2.5);
        assert_relative_eq!(m[4], 4.0);

        assert_eq!(moving_average(&s, 1), s.to_vec());
    }

    #[test]
    fn test_detrend_removes_linear_trend_inside() {
        let s: Vec<f64> = (0..20).map(|t| 2.0 * t as f64 + 1.0).collect();
        let d = detrend(&s, 5);
        for v in &d[2..18] {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-12);
        }
        // shrunk window at the edge is no longer centered
        assert!(d[0] < 0.0);
    }

    #[test]
    fn test_lag_range() {
        assert_eq!(lag_range(4), vec![-2, -1, 0, 1, 2]);
        assert_eq!(lag_range(5), vec![-2, -1, 0, 1, 2]);
        assert_eq!(lag_range(0), vec![0]);
    }

    #[test]
    fn test_autocorrelation_peaks_at_zero() {
        let x = pulse(64, 30.0, 4.0);
        let c = cross_correlate(&x, &x, &lag_range(10)).unwrap();
        assert_relative_eq!(c[5], 1.0, epsilon = 1e-12);
        for (i, v) in c.iter().enumerate() {
            assert!(*v <= c[5]);
            // symmetric in the lag
            assert_relative_eq!(*v, c[10 - i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_delayed_series_peaks_at_delay() {
        let x = pulse(80, 30.0, 3.0);
        let y = pulse(80, 36.0, 3.0);
        let lags = lag_range(20);
        let c = cross_correlate(&x, &y, &lags).unwrap();
        let best = (0..c.len()).max_by(|&a, &b| c[a].total_cmp(&c[b])).unwrap();
        assert_eq!(lags[best], 6);

        let c = cross_correlate(&y, &x, &lags).unwrap();
        let best = (0..c.len()).max_by(|&a, &b| c[a].total_cmp(&c[b])).unwrap();
        assert_eq!(lags[best], -6);
    }

    #[test]
    fn test_constant_series_is_nan() {
        let x = vec![2.0; 10];
        let y = pulse(10, 5.0, 1.0);
        let c = cross_correlate(&x, &y, &[0, 1]).unwrap();
        assert!(c.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_bounds() {
        let x = pulse(10, 5.0, 1.0);
        assert!(matches!(
            cross_correlate(&x, &x[..9], &[0]),
            Err(SyncomError::BoundsError(_))
        ));
        assert_eq!(
            cross_correlate(&x, &x, &[-10, 0]),
            Err(SyncomError::BoundsError(
                "lag -10 exceeds series length 10".into()
            ))
        );
        assert!(cross_correlate(&x[..1], &x[..1], &[0]).is_err());
    }
}
