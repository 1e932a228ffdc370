#![allow(dead_code)]

use syncom::angular_field::{AngularField, AngularStatistics};
use syncom::constants::N_ANGULAR_BINS;

/// Gaussian pulse of unit height sampled at `t = 0..n-1`.
pub fn pulse(n: usize, center: f64, width: f64) -> Vec<f64> {
    (0..n)
        .map(|t| (-(t as f64 - center).powi(2) / (2.0 * width * width)).exp())
        .collect()
}

/// Statistics with the same speed at every angle and no period field.
pub fn constant_stats(v_kms: f64) -> AngularStatistics {
    AngularStatistics::new(AngularField::constant(v_kms, N_ANGULAR_BINS).unwrap(), None).unwrap()
}

/// CSV text with one `velocity_kms,frequency_hz` row per angular bin.
pub fn stats_csv(n_bins: usize) -> String {
    let mut text = String::from("velocity_kms,frequency_hz\n");
    for i in 0..n_bins {
        let v = 350.0 + 150.0 * (i as f64 / n_bins as f64 * std::f64::consts::TAU).cos();
        text.push_str(&format!("{v:.3},0.0005\n"));
    }
    text
}
