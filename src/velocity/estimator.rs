//! # Velocity estimator
//!
//! [`VelocityEstimator`] turns distance–time data into outflow speeds. For every
//! angular slice it
//!
//! 1. extracts the brightness time series at the radial pixels of `r1` and `r2`,
//! 2. optionally removes their moving-average trend,
//! 3. correlates them over the lags `[-L/2, +L/2]`,
//! 4. takes the integer correlation peak and, if requested and possible, refines it
//!    with a polynomial fit,
//! 5. converts the peak lag into a speed.
//!
//! Inputs are either a single time × radius map ([`VelocityEstimator::estimate_slice`]),
//! a stack of them ordered by angle ([`VelocityEstimator::estimate`]), or an
//! [`ImageCube`] ([`VelocityEstimator::estimate_cube`]).
//!
//! Non-finite speeds (zero lag, flat series, degenerate fits) are legitimate outputs;
//! [`VelocityMap::finite`] filters them out.

use itertools::Itertools;
use log::{debug, info, warn};
use nalgebra::DMatrix;

use crate::constants::KmPerSecond;
use crate::image_cube::ImageCube;
use crate::syncom_errors::SyncomError;
use crate::velocity::correlation::{cross_correlate, detrend, lag_range};
use crate::velocity::peak::{find_peak, refine_peak};
use crate::velocity::VelocityParams;

/// Correlation peak retained for one slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakLag {
    /// Index of the integer peak in the lag array.
    pub index: usize,
    /// Integer lag of the peak, in frames.
    pub raw_lag: isize,
    /// Lag used for the speed, in frames (refined when `refined` is true).
    pub lag: f64,
    /// Whether the polynomial refinement was applied.
    pub refined: bool,
}

/// One speed per angular slice, with the peak it was derived from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VelocityMap {
    pub velocities: Vec<KmPerSecond>,
    pub peaks: Vec<Option<PeakLag>>,
}

impl VelocityMap {
    pub fn len(&self) -> usize {
        self.velocities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.velocities.is_empty()
    }

    /// `(slice index, speed)` for every finite speed.
    pub fn finite(&self) -> impl Iterator<Item = (usize, KmPerSecond)> + '_ {
        self.velocities
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
    }

    /// Mean of the finite speeds.
    pub fn mean_finite(&self) -> Option<KmPerSecond> {
        let (sum, count) = self
            .finite()
            .fold((0.0, 0usize), |(s, c), (_, v)| (s + v, c + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Median of the finite speeds.
    pub fn median_finite(&self) -> Option<KmPerSecond> {
        let sorted = self
            .finite()
            .map(|(_, v)| v)
            .sorted_by(|a, b| a.total_cmp(b))
            .collect_vec();
        let n = sorted.len();
        match n {
            0 => None,
            _ if n % 2 == 1 => Some(sorted[n / 2]),
            _ => Some(0.5 * (sorted[n / 2 - 1] + sorted[n / 2])),
        }
    }
}

/// Cross-correlation velocity estimator.
#[derive(Debug, Clone)]
pub struct VelocityEstimator {
    params: VelocityParams,
    lags: Vec<isize>,
}

impl VelocityEstimator {
    pub fn new(params: VelocityParams) -> Self {
        let lags = lag_range(params.max_lag);
        VelocityEstimator { params, lags }
    }

    pub fn params(&self) -> &VelocityParams {
        &self.params
    }

    /// Lags at which the correlation is evaluated.
    pub fn lags(&self) -> &[isize] {
        &self.lags
    }

    /// Radial pixels of `r1` and `r2` on a grid of `ny` radial pixels.
    ///
    /// Return
    /// ----------
    /// * `Err(SyncomError::BoundsError)` if either radius falls outside `[0, ny)`.
    pub fn radial_indices(&self, ny: usize) -> Result<(usize, usize), SyncomError> {
        let check = |r: f64| {
            let idx = self.params.radial_index(r);
            if idx < 0 || idx as usize >= ny {
                Err(SyncomError::BoundsError(format!(
                    "radius {r} Rsun maps to radial pixel {idx}, outside [0, {ny})"
                )))
            } else {
                Ok(idx as usize)
            }
        };
        Ok((check(self.params.r1_rsun)?, check(self.params.r2_rsun)?))
    }

    /// Speed (km/s) corresponding to a peak lag (frames).
    ///
    /// A zero lag gives an infinite speed, or `NaN` when `r1 == r2`.
    pub fn velocity_from_lag(&self, lag: f64) -> KmPerSecond {
        let p = &self.params;
        (p.r2_rsun - p.r1_rsun) * p.pixels_per_rsun() * p.km_per_pixel()
            / (lag * p.time_cadence_s)
    }

    /// Correlation peak between two time series.
    ///
    /// Arguments
    /// -----------------
    /// * `profile1`: time series at `r1`.
    /// * `profile2`: time series at `r2`, same length.
    ///
    /// Return
    /// ----------
    /// * `Ok(None)` if the correlation has no defined value (flat series).
    /// * `Ok(Some(peak))` otherwise; the lag is refined only when `poly_order` is set
    ///   and the peak has two neighbours on each side.
    /// * `Err(SyncomError::BoundsError)` if the lengths differ or the lag window does
    ///   not fit in the series.
    pub fn peak_lag(
        &self,
        profile1: &[f64],
        profile2: &[f64],
    ) -> Result<Option<PeakLag>, SyncomError> {
        if self.params.half_lag() >= profile1.len() {
            return Err(SyncomError::BoundsError(format!(
                "lag window ±{} does not fit in {} time steps",
                self.params.half_lag(),
                profile1.len()
            )));
        }

        let corr = match self.params.detrend_time_scale {
            Some(w) => cross_correlate(&detrend(profile1, w), &detrend(profile2, w), &self.lags)?,
            None => cross_correlate(profile1, profile2, &self.lags)?,
        };

        let Some(index) = find_peak(&corr) else {
            return Ok(None);
        };
        let raw_lag = self.lags[index];

        let refined = self
            .params
            .poly_order
            .and_then(|order| refine_peak(&corr, index, order));
        if self.params.poly_order.is_some() && refined.is_none() {
            debug!("peak at lag {raw_lag} too close to the lag window edge, refinement skipped");
        }

        Ok(Some(PeakLag {
            index,
            raw_lag,
            lag: refined.map_or(raw_lag as f64, |p| p + self.lags[0] as f64),
            refined: refined.is_some(),
        }))
    }

    /// Speed between two time series; `NaN` if the correlation is undefined.
    pub fn estimate_profiles(
        &self,
        profile1: &[f64],
        profile2: &[f64],
    ) -> Result<KmPerSecond, SyncomError> {
        Ok(self
            .peak_lag(profile1, profile2)?
            .map_or(f64::NAN, |peak| self.velocity_from_lag(peak.lag)))
    }

    /// Speed and peak for one time × radius map.
    pub fn estimate_slice(
        &self,
        distance_time: &DMatrix<f64>,
    ) -> Result<(KmPerSecond, Option<PeakLag>), SyncomError> {
        let (i1, i2) = self.radial_indices(distance_time.ncols())?;
        let profile1: Vec<f64> = distance_time.column(i1).iter().copied().collect();
        let profile2: Vec<f64> = distance_time.column(i2).iter().copied().collect();

        let peak = self.peak_lag(&profile1, &profile2)?;
        let velocity = peak.map_or(f64::NAN, |p| self.velocity_from_lag(p.lag));
        Ok((velocity, peak))
    }

    /// One speed per slice of a stack of time × radius maps ordered by angle.
    ///
    /// The first failing slice aborts the call; no partial map is returned.
    pub fn estimate(&self, slices: &[DMatrix<f64>]) -> Result<VelocityMap, SyncomError> {
        self.collect_map(slices.iter().map(|slice| self.estimate_slice(slice)))
    }

    /// One speed per angular pixel of an image cube.
    ///
    /// Only the time series at the radial pixels of `r1` and `r2` are read.
    pub fn estimate_cube(&self, cube: &ImageCube) -> Result<VelocityMap, SyncomError> {
        let (nx, ny, _) = cube.dims();
        let (i1, i2) = self.radial_indices(ny)?;

        self.collect_map((0..nx).map(|angle| -> Result<_, SyncomError> {
            let profile1 = cube.time_series(angle, i1)?;
            let profile2 = cube.time_series(angle, i2)?;
            let peak = self.peak_lag(&profile1, &profile2)?;
            let velocity = peak.map_or(f64::NAN, |p| self.velocity_from_lag(p.lag));
            Ok((velocity, peak))
        }))
    }

    fn collect_map(
        &self,
        results: impl Iterator<Item = Result<(KmPerSecond, Option<PeakLag>), SyncomError>>,
    ) -> Result<VelocityMap, SyncomError> {
        let mut map = VelocityMap {
            velocities: Vec::with_capacity(results.size_hint().0),
            peaks: Vec::with_capacity(results.size_hint().0),
        };

        for (angle, result) in results.enumerate() {
            let (velocity, peak) = result?;
            debug!("slice {angle}: peak {peak:?}, velocity {velocity:.2} km/s");
            map.velocities.push(velocity);
            map.peaks.push(peak);
        }

        if self.params.poly_order.is_some() {
            let n_unrefined = map.peaks.iter().flatten().filter(|p| !p.refined).count();
            if n_unrefined > 0 {
                warn!(
                    "{} of {} slices peaked at the lag window edge and kept their integer lag",
                    n_unrefined,
                    map.len()
                );
            }
        }
        let n_finite = map.finite().count();
        if n_finite < map.len() {
            warn!(
                "{} of {} slices gave a non-finite velocity",
                map.len() - n_finite,
                map.len()
            );
        }
        info!(
            "velocity map: {} slices, median {:?} km/s",
            map.len(),
            map.median_finite()
        );
        Ok(map)
    }
}

#[cfg(test)]
mod estimator_test {
    use super::*;
    use approx::assert_relative_eq;

    fn pulse(n: usize, center: f64, width: f64) -> Vec<f64> {
        (0..n)
            .map(|t| (-(t as f64 - center).powi(2) / (2.0 * width * width)).exp())
            .collect()
    }

    fn estimator(poly_order: Option<usize>) -> VelocityEstimator {
        VelocityEstimator::new(
            VelocityParams::builder()
                .radii_rsun(2.0, 3.0)
                .pixel_size_rsun(0.1)
                .max_lag(20)
                .poly_order(poly_order)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_identical_series_zero_lag_infinite_velocity() {
        let p = pulse(100, 40.0, 4.0);
        let est = estimator(None);
        let peak = est.peak_lag(&p, &p).unwrap().unwrap();
        assert_eq!(peak.raw_lag, 0);
        assert_eq!(peak.index, 10);
        assert!(!est.estimate_profiles(&p, &p).unwrap().is_finite());
    }

    #[test]
    fn test_integer_shift_recovered() {
        let est = estimator(None);
        for k in [-7isize, -3, 1, 4, 9] {
            let p1 = pulse(120, 50.0, 3.0);
            let p2 = pulse(120, 50.0 + k as f64, 3.0);
            let peak = est.peak_lag(&p1, &p2).unwrap().unwrap();
            assert_eq!(peak.raw_lag, k);
            assert_eq!(peak.lag, k as f64);
            assert!(!peak.refined);
        }
    }

    #[test]
    fn test_refinement_of_fractional_shift() {
        let p1 = pulse(120, 50.0, 4.0);
        let p2 = pulse(120, 53.4, 4.0);

        let raw = estimator(None).peak_lag(&p1, &p2).unwrap().unwrap();
        assert_eq!(raw.raw_lag, 3);

        let refined = estimator(Some(2)).peak_lag(&p1, &p2).unwrap().unwrap();
        assert!(refined.refined);
        assert!((refined.lag - 3.4).abs() < 0.5);
        assert!((refined.lag - 3.4).abs() < (raw.lag - 3.4).abs());
    }

    #[test]
    fn test_velocity_conversion() {
        let est = estimator(None);
        // 1 Rsun = 696000 km covered in 2 frames of 300 s
        assert_relative_eq!(est.velocity_from_lag(2.0), 1160.0, epsilon = 1e-9);
        assert_relative_eq!(est.velocity_from_lag(-2.0), -1160.0, epsilon = 1e-9);
        assert!(est.velocity_from_lag(0.0).is_infinite());
    }

    #[test]
    fn test_refinement_skipped_near_lag_edge() {
        // lags [-10, 10]: a -9 shift puts the peak at index 1
        let p1 = pulse(120, 60.0, 3.0);
        let p2 = pulse(120, 51.0, 3.0);

        let with_fit = estimator(Some(2));
        let peak = with_fit.peak_lag(&p1, &p2).unwrap().unwrap();
        assert_eq!(peak.index, 1);
        assert!(!peak.refined);
        assert_eq!(peak.lag, -9.0);

        let v_fit = with_fit.estimate_profiles(&p1, &p2).unwrap();
        let v_raw = estimator(None).estimate_profiles(&p1, &p2).unwrap();
        assert_eq!(v_fit, v_raw);
        assert_relative_eq!(v_raw, with_fit.velocity_from_lag(-9.0));
    }

    #[test]
    fn test_detrending_keeps_peak() {
        let trend: Vec<f64> = (0..150).map(|t| 0.02 * t as f64).collect();
        let p1: Vec<f64> = pulse(150, 60.0, 3.0).iter().zip(&trend).map(|(a, b)| a + b).collect();
        let p2: Vec<f64> = pulse(150, 65.0, 3.0).iter().zip(&trend).map(|(a, b)| a + b).collect();

        let est = VelocityEstimator::new(
            VelocityParams::builder()
                .max_lag(20)
                .detrend_time_scale(Some(15))
                .build()
                .unwrap(),
        );
        let peak = est.peak_lag(&p1, &p2).unwrap().unwrap();
        assert_eq!(peak.raw_lag, 5);
    }

    #[test]
    fn test_flat_series_is_nan() {
        let est = estimator(Some(2));
        let flat = vec![1.0; 50];
        assert_eq!(est.peak_lag(&flat, &flat).unwrap(), None);
        assert!(est.estimate_profiles(&flat, &flat).unwrap().is_nan());
    }

    #[test]
    fn test_bounds_errors() {
        let est = estimator(None);
        // lag window ±10 needs more than 10 samples
        let short = pulse(10, 5.0, 1.0);
        assert!(matches!(
            est.peak_lag(&short, &short),
            Err(SyncomError::BoundsError(_))
        ));

        // r2 = 3 Rsun is radial pixel 30
        let map = DMatrix::<f64>::zeros(40, 30);
        assert_eq!(
            est.estimate_slice(&map).unwrap_err(),
            SyncomError::BoundsError(
                "radius 3 Rsun maps to radial pixel 30, outside [0, 30)".into()
            )
        );
    }

    #[test]
    fn test_estimate_stack() {
        let est = estimator(None);
        // radial pixels 20 and 30; slice a has a 4-frame delay, slice b is flat
        let mut a = DMatrix::<f64>::zeros(100, 32);
        for (t, (v1, v2)) in pulse(100, 40.0, 3.0)
            .into_iter()
            .zip(pulse(100, 44.0, 3.0))
            .enumerate()
        {
            a[(t, 20)] = v1;
            a[(t, 30)] = v2;
        }
        let b = DMatrix::<f64>::zeros(100, 32);

        let map = est.estimate(&[a, b]).unwrap();
        assert_eq!(map.len(), 2);
        assert_relative_eq!(map.velocities[0], est.velocity_from_lag(4.0));
        assert!(map.velocities[1].is_nan());
        assert_eq!(map.peaks[0].unwrap().raw_lag, 4);
        assert_eq!(map.finite().count(), 1);
        assert_relative_eq!(map.mean_finite().unwrap(), map.velocities[0]);
    }

    #[test]
    fn test_estimate_cube_reads_two_radii() {
        let est = estimator(Some(2));
        let (near, far) = (pulse(100, 40.0, 3.0), pulse(100, 44.0, 3.0));
        let frames = (0..100)
            .map(|t| {
                let mut frame = DMatrix::<f64>::zeros(2, 32);
                frame[(0, 20)] = near[t];
                frame[(0, 30)] = far[t];
                frame
            })
            .collect();
        let cube = ImageCube::from_frames(frames, 0).unwrap();

        let map = est.estimate_cube(&cube).unwrap();
        let from_slices = est.estimate(&cube.distance_time_maps()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.peaks, from_slices.peaks);
        assert_relative_eq!(map.velocities[0], from_slices.velocities[0]);
        assert!(map.peaks[0].unwrap().refined);
        assert!(map.velocities[1].is_nan());

        let narrow = ImageCube::from_frames(vec![DMatrix::zeros(2, 25); 40], 0).unwrap();
        assert!(matches!(
            est.estimate_cube(&narrow),
            Err(SyncomError::BoundsError(_))
        ));
    }

    #[test]
    fn test_velocity_map_statistics() {
        let map = VelocityMap {
            velocities: vec![300.0, f64::INFINITY, 500.0, f64::NAN, 400.0, 350.0],
            peaks: vec![None; 6],
        };
        assert_eq!(map.finite().map(|(i, _)| i).collect_vec(), vec![0, 2, 4, 5]);
        assert_relative_eq!(map.mean_finite().unwrap(), 387.5);
        assert_relative_eq!(map.median_finite().unwrap(), 375.0);
        assert_eq!(VelocityMap::default().median_finite(), None);
    }
}
