mod common;

use approx::assert_relative_eq;
use syncom::frame_sink::NullSink;
use syncom::synthesis::driver::Simulation;
use syncom::synthesis::SyncomParams;
use syncom::syncom_errors::SyncomError;
use syncom::velocity::estimator::VelocityEstimator;
use syncom::velocity::VelocityParams;

use crate::common::{constant_stats, pulse};

// 2 px/frame at 0.014 Rsun/px and a 300 s cadence
const SPEED_KMS: f64 = 64.96;

fn single_blob_cube() -> (Simulation, syncom::image_cube::ImageCube) {
    let params = SyncomParams::builder()
        .n_blobs(1)
        .initial_radius_rsun(Some(0.0))
        .grid(36, 200)
        .field_smoothing_bins(1)
        .seed(7)
        .build()
        .unwrap();
    let sim = Simulation::new(params, &constant_stats(SPEED_KMS)).unwrap();
    let cube = sim.run(0, 100, &mut NullSink).unwrap();
    (sim, cube)
}

fn estimator_params() -> VelocityParams {
    VelocityParams::builder()
        .radii_rsun(0.7, 1.4)
        .max_lag(60)
        .build()
        .unwrap()
}

#[test]
fn test_recovers_synthetic_speed() {
    let (sim, cube) = single_blob_cube();
    let blob = sim.blobs()[0];
    assert_relative_eq!(blob.radial_velocity_px, 2.0, max_relative = 1e-12);

    let estimator = VelocityEstimator::new(estimator_params());
    assert_eq!(estimator.radial_indices(200).unwrap(), (50, 100));

    let angle = blob.angular_pixel(36).round() as usize % 36;
    let (velocity, peak) = estimator
        .estimate_slice(&cube.distance_time(angle).unwrap())
        .unwrap();
    let peak = peak.unwrap();
    assert_eq!(peak.raw_lag, 25);
    assert!(!peak.refined);
    assert_relative_eq!(velocity, SPEED_KMS, max_relative = 1e-9);

    // every angular slice sees the same radial motion
    let map = estimator.estimate_cube(&cube).unwrap();
    assert_eq!(map.len(), 36);
    assert_relative_eq!(map.median_finite().unwrap(), SPEED_KMS, max_relative = 1e-9);
}

#[test]
fn test_refined_lag_stays_near_integer_peak() {
    let (sim, cube) = single_blob_cube();
    let angle = sim.blobs()[0].angular_pixel(36).round() as usize % 36;

    let params = VelocityParams::builder()
        .radii_rsun(0.7, 1.4)
        .max_lag(60)
        .poly_order(Some(2))
        .build()
        .unwrap();
    let (velocity, peak) = VelocityEstimator::new(params)
        .estimate_slice(&cube.distance_time(angle).unwrap())
        .unwrap();
    let peak = peak.unwrap();
    assert!(peak.refined);
    assert!((peak.lag - 25.0).abs() <= 1.0);
    assert!((velocity - SPEED_KMS).abs() / SPEED_KMS < 0.05);
}

#[test]
fn test_opposite_order_gives_negative_speed() {
    let estimator = VelocityEstimator::new(estimator_params());
    let near = pulse(120, 40.0, 4.0);
    let far = pulse(120, 52.0, 4.0);

    let forward = estimator.estimate_profiles(&near, &far).unwrap();
    let backward = estimator.estimate_profiles(&far, &near).unwrap();
    assert!(forward > 0.0);
    assert_relative_eq!(backward, -forward, max_relative = 1e-12);
}

#[test]
fn test_radii_outside_cube() {
    let (_, cube) = single_blob_cube();
    let params = VelocityParams::builder()
        .radii_rsun(1.0, 3.0)
        .max_lag(20)
        .build()
        .unwrap();
    let err = VelocityEstimator::new(params).estimate_cube(&cube).unwrap_err();
    assert!(matches!(err, SyncomError::BoundsError(_)));
}
