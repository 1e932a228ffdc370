//! # Blob parameters
//!
//! A [`BlobRecord`] describes one simulated density enhancement: where it is
//! launched, at which position angle, how fast it moves outward, how often it
//! recurs and how wide it is. [`BlobParameterSampler`] draws a whole population
//! from the per-angle speed and period fields.
//!
//! ## Ordering and launch events
//!
//! The sampled population is sorted by **decreasing radial speed**. Walking that
//! order, blobs whose speed truncates to the same integer (km/s) as their
//! predecessor are treated as one physical launch event and share its launch
//! time; any other blob opens a new event one time unit later. The first blob
//! always opens event 0.
//!
//! ## Randomness
//!
//! The sampler never touches a global generator. Each stochastic quantity
//! (launch radius, position angle, size) gets its own [`StdRng`] stream seeded
//! from the generator handed to [`BlobParameterSampler::sample`], so a run is
//! reproducible from the seed recorded in
//! [`SyncomParams::seed`](crate::synthesis::SyncomParams::seed).

use std::borrow::Cow;

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::angular_field::{AngularField, AngularStatistics};
use crate::constants::{
    kms_to_px_per_frame, DegTenths, Degree, KmPerSecond, Pixel, PixelPerFrame, Second,
    N_ANGULAR_BINS,
};
use crate::synthesis::{SyncomParams, VelocityProfile};
use crate::syncom_errors::SyncomError;

/// One simulated solar-wind density enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlobRecord {
    /// Radial pixel where the blob first appears.
    pub launch_radius_px: Pixel,
    /// Position angle in tenths of a degree, in `[0, 3600)`.
    pub angular_position: DegTenths,
    /// Launch event the blob belongs to, in frames.
    pub launch_time: f64,
    /// Time between successive re-launches at the same position angle.
    pub period_s: Second,
    /// Outflow speed read from the angular field.
    pub radial_velocity_kms: KmPerSecond,
    /// Outflow speed in grid units.
    pub radial_velocity_px: PixelPerFrame,
    /// Blob width parameter; the angular standard deviation of its kernel.
    pub size_deg: Degree,
}

impl BlobRecord {
    /// Angular pixel of the blob center on a grid with `nx` angular pixels.
    pub fn angular_pixel(&self, nx: usize) -> f64 {
        self.angular_position * nx as f64 / N_ANGULAR_BINS as f64
    }

    /// Standard deviations `(angular, radial)` of the blob kernel.
    pub fn sigma(&self) -> (f64, f64) {
        (self.size_deg, 2.0 * self.size_deg)
    }

    /// Speed key used to group blobs into launch events.
    #[inline]
    pub fn velocity_key(&self) -> i64 {
        self.radial_velocity_kms.trunc() as i64
    }

    /// Check the invariants the renderer relies on.
    ///
    /// Return
    /// ----------
    /// * `Err(SyncomError::ConfigurationError)` if the period is not strictly positive,
    ///   the size is not strictly positive, or any field is non-finite.
    pub fn validate(&self) -> Result<(), SyncomError> {
        if !(self.period_s.is_finite() && self.period_s > 0.0) {
            return Err(SyncomError::ConfigurationError(format!(
                "blob period must be finite and > 0, got {}",
                self.period_s
            )));
        }
        if !(self.size_deg.is_finite() && self.size_deg > 0.0) {
            return Err(SyncomError::ConfigurationError(format!(
                "blob size must be finite and > 0, got {}",
                self.size_deg
            )));
        }
        let finite = [
            self.launch_radius_px,
            self.angular_position,
            self.launch_time,
            self.radial_velocity_kms,
            self.radial_velocity_px,
        ]
        .iter()
        .all(|x| x.is_finite());
        if !finite {
            return Err(SyncomError::ConfigurationError(format!(
                "blob parameters must be finite: {self:?}"
            )));
        }
        Ok(())
    }
}

/// Sort blobs by decreasing outflow speed.
///
/// The sort is stable: blobs with equal speed keep their sampling order.
pub fn sort_by_velocity(blobs: Vec<BlobRecord>) -> Vec<BlobRecord> {
    blobs
        .into_iter()
        .sorted_by(|a, b| b.radial_velocity_kms.total_cmp(&a.radial_velocity_kms))
        .collect()
}

/// Assign launch times to a speed-sorted population.
///
/// A blob whose truncated speed equals its predecessor's joins the predecessor's
/// launch event; otherwise the event counter is incremented by one. The first
/// blob has no predecessor and always opens event 0.
pub fn assign_launch_times(sorted: &mut [BlobRecord]) {
    let mut counter = 0.0;
    let mut previous: Option<i64> = None;

    for blob in sorted.iter_mut() {
        let key = blob.velocity_key();
        match previous {
            Some(p) if p != key => counter += 1.0,
            _ => {}
        }
        blob.launch_time = counter;
        previous = Some(key);
    }
}

/// Draws a blob population from per-angle speed and period fields.
#[derive(Debug, Clone)]
pub struct BlobParameterSampler<'a> {
    params: &'a SyncomParams,
    stats: &'a AngularStatistics,
    velocity: Cow<'a, AngularField>,
}

impl<'a> BlobParameterSampler<'a> {
    /// Prepare a sampler for `params`.
    ///
    /// With [`VelocityProfile::Sinusoidal`] the observed velocity field of `stats` is
    /// replaced by the synthetic profile; periods are always read from `stats`.
    ///
    /// Return
    /// ----------
    /// * `Err(SyncomError::ConfigurationError)` if `params` breaks a rule of
    ///   [`SyncomParams::validate`] or the velocity field has zero length.
    pub fn new(
        params: &'a SyncomParams,
        stats: &'a AngularStatistics,
    ) -> Result<Self, SyncomError> {
        params.validate()?;
        if stats.velocity.is_empty() {
            return Err(SyncomError::ConfigurationError(
                "angular velocity field has zero length".into(),
            ));
        }

        let velocity = match params.velocity_profile {
            VelocityProfile::Observed => Cow::Borrowed(&stats.velocity),
            VelocityProfile::Sinusoidal {
                base_kms,
                amplitude_kms,
            } => Cow::Owned(AngularField::sinusoidal(
                base_kms,
                amplitude_kms,
                N_ANGULAR_BINS,
            )?),
        };

        Ok(BlobParameterSampler {
            params,
            stats,
            velocity,
        })
    }

    /// Speed field the sampler reads from (observed or synthetic).
    pub fn velocity_field(&self) -> &AngularField {
        &self.velocity
    }

    /// Draw `n_blobs` blobs, sorted by decreasing speed, with launch times assigned.
    ///
    /// Arguments
    /// -----------------
    /// * `rng`: generator seeding one independent stream per stochastic quantity.
    ///
    /// Return
    /// ----------
    /// * The population in decreasing-speed order, or
    ///   `Err(SyncomError::ConfigurationError)` if a sampled blob breaks a
    ///   [`BlobRecord`] invariant (e.g. a non-positive period in the dataset).
    pub fn sample(&self, rng: &mut impl Rng) -> Result<Vec<BlobRecord>, SyncomError> {
        let p = self.params;
        let n = p.n_blobs;

        let mut radius_rng = StdRng::seed_from_u64(rng.random());
        let mut angle_rng = StdRng::seed_from_u64(rng.random());
        let mut size_rng = StdRng::seed_from_u64(rng.random());

        let radii: Vec<Pixel> = match p.initial_radius_px() {
            Some(r0) => vec![r0; n],
            None => (0..n)
                .map(|_| radius_rng.random_range(0.0..p.ny as f64))
                .collect(),
        };
        let angles: Vec<DegTenths> = (0..n)
            .map(|_| angle_rng.random_range(0..N_ANGULAR_BINS) as f64)
            .collect();
        let (size_min, size_max) = p.size_range_deg;
        let sizes: Vec<Degree> = (0..n)
            .map(|_| size_rng.random_range(size_min..=size_max) * p.blob_size_scale)
            .collect();

        let km_per_px = p.km_per_pixel();
        let blobs = radii
            .into_iter()
            .zip(angles)
            .zip(sizes)
            .map(|((launch_radius_px, angular_position), size_deg)| {
                let v_kms = self.velocity.value_at(angular_position);
                BlobRecord {
                    launch_radius_px,
                    angular_position,
                    launch_time: 0.0,
                    period_s: self.stats.period_at(angular_position, p.default_period_s),
                    radial_velocity_kms: v_kms,
                    radial_velocity_px: kms_to_px_per_frame(v_kms, p.time_cadence_s, km_per_px),
                    size_deg,
                }
            })
            .collect();

        let mut sorted = sort_by_velocity(blobs);
        assign_launch_times(&mut sorted);

        sorted.iter().try_for_each(BlobRecord::validate)?;
        Ok(sorted)
    }
}

#[cfg(test)]
mod blob_test {
    use super::*;
    use itertools::Itertools;

    fn record(v_kms: f64) -> BlobRecord {
        BlobRecord {
            launch_radius_px: 0.0,
            angular_position: 0.0,
            launch_time: -1.0,
            period_s: 100.0,
            radial_velocity_kms: v_kms,
            radial_velocity_px: v_kms / 32.48,
            size_deg: 2.0,
        }
    }

    fn stats() -> AngularStatistics {
        let velocity = AngularField::new(
            (0..N_ANGULAR_BINS)
                .map(|i| 300.0 + (i % 400) as f64 * 0.5)
                .collect(),
        )
        .unwrap();
        let period = AngularField::constant(1800.0, N_ANGULAR_BINS).unwrap();
        AngularStatistics::new(velocity, Some(period)).unwrap()
    }

    #[test]
    fn test_assign_launch_times_groups_truncated_speeds() {
        let mut blobs = sort_by_velocity(vec![
            record(499.9),
            record(300.0),
            record(500.7),
            record(499.1),
            record(500.2),
        ]);
        assign_launch_times(&mut blobs);

        let speeds = blobs.iter().map(|b| b.radial_velocity_kms).collect_vec();
        assert_eq!(speeds, vec![500.7, 500.2, 499.9, 499.1, 300.0]);

        let times = blobs.iter().map(|b| b.launch_time).collect_vec();
        assert_eq!(times, vec![0.0, 0.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_first_blob_opens_event_zero() {
        let mut blobs = vec![record(0.3)];
        assign_launch_times(&mut blobs);
        assert_eq!(blobs[0].launch_time, 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(record(400.0).validate().is_ok());

        let mut bad = record(400.0);
        bad.period_s = 0.0;
        assert!(matches!(
            bad.validate(),
            Err(SyncomError::ConfigurationError(_))
        ));

        let mut bad = record(400.0);
        bad.size_deg = -1.0;
        assert!(bad.validate().is_err());

        let mut bad = record(400.0);
        bad.radial_velocity_px = f64::NAN;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_sample_sorted_with_launch_events() {
        let params = SyncomParams::builder()
            .n_blobs(300)
            .grid(360, 128)
            .build()
            .unwrap();
        let stats = stats();
        let sampler = BlobParameterSampler::new(&params, &stats).unwrap();
        let blobs = sampler.sample(&mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(blobs.len(), 300);
        assert_eq!(blobs[0].launch_time, 0.0);

        for (a, b) in blobs.iter().tuple_windows() {
            assert!(a.radial_velocity_kms >= b.radial_velocity_kms);
            if a.velocity_key() == b.velocity_key() {
                assert_eq!(a.launch_time, b.launch_time);
            } else {
                assert_eq!(b.launch_time - a.launch_time, 1.0);
            }
        }

        for blob in &blobs {
            assert!((0.0..128.0).contains(&blob.launch_radius_px));
            assert!((0.0..3600.0).contains(&blob.angular_position));
            assert!((1.0..=5.0).contains(&blob.size_deg));
            assert_eq!(blob.period_s, 1800.0);
            assert_eq!(
                blob.radial_velocity_kms,
                stats.velocity.value_at(blob.angular_position)
            );
        }
    }

    #[test]
    fn test_sample_is_reproducible() {
        let params = SyncomParams::builder().n_blobs(50).build().unwrap();
        let stats = stats();
        let sampler = BlobParameterSampler::new(&params, &stats).unwrap();

        let a = sampler.sample(&mut StdRng::seed_from_u64(7)).unwrap();
        let b = sampler.sample(&mut StdRng::seed_from_u64(7)).unwrap();
        let c = sampler.sample(&mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_fixed_initial_radius_and_default_period() {
        let params = SyncomParams::builder()
            .n_blobs(20)
            .initial_radius_rsun(Some(0.7))
            .pixel_size_rsun(0.014)
            .default_period_s(900.0)
            .blob_size_scale(2.0)
            .build()
            .unwrap();
        let stats =
            AngularStatistics::new(AngularField::constant(400.0, 360).unwrap(), None).unwrap();
        let blobs = BlobParameterSampler::new(&params, &stats)
            .unwrap()
            .sample(&mut StdRng::seed_from_u64(1))
            .unwrap();

        for blob in &blobs {
            assert!((blob.launch_radius_px - 50.0).abs() < 1e-9);
            assert_eq!(blob.period_s, 900.0);
            assert!((2.0..=10.0).contains(&blob.size_deg));
            // a single speed: one launch event
            assert_eq!(blob.launch_time, 0.0);
        }
    }

    #[test]
    fn test_sinusoidal_profile_overrides_field() {
        let params = SyncomParams::builder()
            .n_blobs(100)
            .velocity_profile(VelocityProfile::Sinusoidal {
                base_kms: 400.0,
                amplitude_kms: 100.0,
            })
            .build()
            .unwrap();
        let stats = stats();
        let sampler = BlobParameterSampler::new(&params, &stats).unwrap();
        let blobs = sampler.sample(&mut StdRng::seed_from_u64(3)).unwrap();

        for blob in &blobs {
            let deg = blob.angular_position / 10.0;
            let expected = 400.0 + 100.0 * (2.0 * std::f64::consts::PI * deg / 180.0).cos();
            assert!((blob.radial_velocity_kms - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_sampler_rejects_empty_configuration() {
        let mut params = SyncomParams::default();
        params.n_blobs = 0;
        let stats = stats();
        assert_eq!(
            BlobParameterSampler::new(&params, &stats).unwrap_err(),
            SyncomError::ConfigurationError("n_blobs must be >= 1".into())
        );
    }

    #[test]
    fn test_sampler_rejects_unvalidated_fields() {
        let stats = stats();

        let mut params = SyncomParams::default();
        params.ny = 0;
        assert_eq!(
            BlobParameterSampler::new(&params, &stats).unwrap_err(),
            SyncomError::ConfigurationError("grid dimensions must be >= 1".into())
        );

        let mut params = SyncomParams::default();
        params.size_range_deg = (5.0, 1.0);
        assert!(matches!(
            BlobParameterSampler::new(&params, &stats),
            Err(SyncomError::ConfigurationError(_))
        ));
    }
}
