//! Benchmarks for the velocity estimator.
//!
//! Examples:
//!   cargo bench --bench cross_correlation
//!   cargo bench cross_correlation -- cross_correlation/estimate_slices_64

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use syncom::velocity::correlation::{cross_correlate, detrend, lag_range};
use syncom::velocity::estimator::VelocityEstimator;
use syncom::velocity::VelocityParams;

/// Time × radius map of a pulse moving at `speed` px/frame over a noisy background.
fn make_slice(rng: &mut StdRng, n_time: usize, n_radius: usize, speed: f64) -> DMatrix<f64> {
    DMatrix::from_fn(n_time, n_radius, |t, r| {
        let d = r as f64 - speed * t as f64 - 10.0;
        (-d * d / 50.0).exp() + 0.05 * rng.random::<f64>()
    })
}

fn bench_correlate(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xDEADBEEF);
    let x: Vec<f64> = (0..512).map(|_| rng.random()).collect();
    let y: Vec<f64> = (0..512).map(|_| rng.random()).collect();
    let lags = lag_range(80);

    c.bench_function("cross_correlation/raw_512", |b| {
        b.iter(|| black_box(cross_correlate(black_box(&x), black_box(&y), &lags).unwrap()))
    });

    c.bench_function("cross_correlation/detrended_512", |b| {
        b.iter(|| {
            let dx = detrend(black_box(&x), 24);
            let dy = detrend(black_box(&y), 24);
            black_box(cross_correlate(&dx, &dy, &lags).unwrap())
        })
    });
}

fn bench_estimate(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xFEED);
    let slices: Vec<DMatrix<f64>> = (0..64)
        .map(|_| {
            let speed = rng.random_range(1.0..3.0);
            make_slice(&mut rng, 200, 400, speed)
        })
        .collect();

    let params = VelocityParams::builder()
        .radii_rsun(1.0, 2.0)
        .max_lag(60)
        .detrend_time_scale(Some(20))
        .poly_order(Some(2))
        .build()
        .unwrap();
    let estimator = VelocityEstimator::new(params);

    c.bench_function("cross_correlation/estimate_slices_64", |b| {
        b.iter(|| black_box(estimator.estimate(black_box(&slices)).unwrap()))
    });
}

criterion_group!(benches, bench_correlate, bench_estimate);
criterion_main!(benches);
