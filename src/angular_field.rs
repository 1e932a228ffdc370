//! # Position-angle fields
//!
//! An [`AngularField`] maps a position angle, sampled in tenths of a degree, to a
//! physical quantity: the outflow speed (km/s) or the recurrence period (s) of the
//! density enhancements seen at that angle. The synthesis engine reads one value
//! per blob from these fields.
//!
//! Fields are built once from an external statistical dataset
//! ([`AngularStatistics`]), smoothed, and rotated into the simulation's angular
//! convention; they are immutable afterwards.
//!
//! ## Loading
//!
//! [`AngularStatistics::from_csv_path`] reads one row per angular bin:
//!
//! ```text
//! velocity_kms,frequency_hz
//! 412.5,0.00031
//! 410.9,0.00030
//! ...
//! ```
//!
//! The `frequency_hz` column is optional; when present, periods are derived as `1/f`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use camino::Utf8Path;
//! use syncom::angular_field::AngularStatistics;
//!
//! let stats = AngularStatistics::from_csv_path(Utf8Path::new("data/stats.csv"))
//!     .unwrap()
//!     .prepare(15, 900);
//! let v_north = stats.velocity.value_at(0.0);
//! ```

use std::io::Read;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::constants::{DegTenths, DPI, N_ANGULAR_BINS};
use crate::syncom_errors::SyncomError;

/// Quantity sampled on a regular grid of position angles covering 360°.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngularField {
    values: Vec<f64>,
}

impl AngularField {
    /// Wrap raw samples; the first sample is position angle 0.
    ///
    /// Return
    /// ----------
    /// * `Err(SyncomError::EmptyAngularField)` if `values` is empty.
    pub fn new(values: Vec<f64>) -> Result<Self, SyncomError> {
        if values.is_empty() {
            return Err(SyncomError::EmptyAngularField);
        }
        Ok(AngularField { values })
    }

    /// Field holding the same value at every angle.
    pub fn constant(value: f64, len: usize) -> Result<Self, SyncomError> {
        AngularField::new(vec![value; len])
    }

    /// Synthetic profile `base + amplitude * cos(2π·angle/180)`, angle in degrees.
    ///
    /// The profile completes two cycles over 360°, giving fast wind at both poles
    /// of the position-angle axis (0° and 180°) and slow wind in between.
    pub fn sinusoidal(base: f64, amplitude: f64, len: usize) -> Result<Self, SyncomError> {
        let step = 360.0 / len as f64;
        AngularField::new(
            (0..len)
                .map(|i| {
                    let deg = i as f64 * step;
                    base + amplitude * (DPI * deg / 180.0).cos()
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Index of the sample covering a position angle given in tenths of a degree.
    ///
    /// Angles are reduced modulo 360°, so negative angles and angles past 3600 wrap.
    /// Fields whose length differs from [`N_ANGULAR_BINS`] are resampled by nearest
    /// lower bin.
    pub fn index_of(&self, angle: DegTenths) -> usize {
        let len = self.values.len();
        let reduced = angle.rem_euclid(N_ANGULAR_BINS as f64);
        let idx = (reduced * len as f64 / N_ANGULAR_BINS as f64).floor() as usize;
        idx.min(len - 1)
    }

    /// Value of the field at a position angle given in tenths of a degree.
    pub fn value_at(&self, angle: DegTenths) -> f64 {
        self.values[self.index_of(angle)]
    }

    /// Circular boxcar smoothing over `window` samples.
    ///
    /// Position angle is periodic, so the averaging window wraps around 0°.
    /// A window of 0 or 1 returns the field unchanged; windows wider than the
    /// field are clamped to its length.
    pub fn smoothed(&self, window: usize) -> AngularField {
        let n = self.values.len();
        let w = window.min(n);
        if w <= 1 {
            return self.clone();
        }
        let half = (w / 2) as isize;

        let values = (0..n as isize)
            .map(|i| {
                let sum: f64 = (0..w as isize)
                    .map(|k| self.values[(i - half + k).rem_euclid(n as isize) as usize])
                    .sum();
                sum / w as f64
            })
            .collect();
        AngularField { values }
    }

    /// Circularly rotate the field by `bins` samples (positive moves values to higher angles).
    pub fn rotated(&self, bins: isize) -> AngularField {
        let n = self.values.len() as isize;
        let values = (0..n)
            .map(|i| self.values[(i - bins).rem_euclid(n) as usize])
            .collect();
        AngularField { values }
    }

    /// Interpret the field as frequencies (Hz) and return the matching periods (s).
    ///
    /// A zero frequency maps to an infinite period.
    pub fn frequency_to_period(&self) -> AngularField {
        AngularField {
            values: self.values.iter().map(|f| 1.0 / f).collect(),
        }
    }
}

/// Statistical description of the outflow per position angle.
#[derive(Debug, Clone, PartialEq)]
pub struct AngularStatistics {
    /// Outflow speed in km/s.
    pub velocity: AngularField,
    /// Recurrence period in seconds, if the dataset provides one.
    pub period: Option<AngularField>,
}

#[inline]
fn valid_frequency(f: f64) -> bool {
    f.is_finite() && f > 0.0
}

#[derive(Debug, Deserialize)]
struct AngularRecord {
    velocity_kms: f64,
    #[serde(default)]
    frequency_hz: Option<f64>,
}

impl AngularStatistics {
    /// Pair a velocity field with an optional period field of the same length.
    pub fn new(
        velocity: AngularField,
        period: Option<AngularField>,
    ) -> Result<Self, SyncomError> {
        if let Some(p) = &period {
            if p.len() != velocity.len() {
                return Err(SyncomError::AngularFieldLengthMismatch {
                    expected: velocity.len(),
                    found: p.len(),
                });
            }
        }
        Ok(AngularStatistics { velocity, period })
    }

    /// Build the statistics from a velocity field and a frequency field (Hz).
    ///
    /// Return
    /// ----------
    /// * `Err(SyncomError::ConfigurationError)` if a frequency is not finite and > 0.
    pub fn from_frequency(
        velocity: AngularField,
        frequency: AngularField,
    ) -> Result<Self, SyncomError> {
        if let Some((bin, f)) = frequency
            .values()
            .iter()
            .enumerate()
            .find(|(_, f)| !valid_frequency(**f))
        {
            return Err(SyncomError::ConfigurationError(format!(
                "frequency at bin {bin} must be finite and > 0, got {f}"
            )));
        }
        AngularStatistics::new(velocity, Some(frequency.frequency_to_period()))
    }

    /// Parse `velocity_kms[,frequency_hz]` rows (with header) from any reader.
    ///
    /// Either every row carries a frequency or none does.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, SyncomError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut velocity = Vec::new();
        let mut frequency = Vec::new();
        let mut with_frequency = false;

        for (i, row) in rdr.deserialize::<AngularRecord>().enumerate() {
            let record = row?;
            // header is line 1
            let line = i + 2;

            if !record.velocity_kms.is_finite() {
                return Err(SyncomError::InvalidAngularRecord {
                    line,
                    reason: format!("non-finite velocity {}", record.velocity_kms),
                });
            }

            if let Some(f) = record.frequency_hz.filter(|f| !valid_frequency(*f)) {
                return Err(SyncomError::InvalidAngularRecord {
                    line,
                    reason: format!("frequency must be finite and > 0, got {f}"),
                });
            }

            if velocity.is_empty() {
                with_frequency = record.frequency_hz.is_some();
            } else if record.frequency_hz.is_some() != with_frequency {
                return Err(SyncomError::InvalidAngularRecord {
                    line,
                    reason: "frequency column must be filled on every row or on none".into(),
                });
            }

            velocity.push(record.velocity_kms);
            frequency.extend(record.frequency_hz);
        }

        let velocity = AngularField::new(velocity)?;
        if frequency.is_empty() {
            AngularStatistics::new(velocity, None)
        } else {
            AngularStatistics::from_frequency(velocity, AngularField::new(frequency)?)
        }
    }

    /// Parse an angular statistics CSV file.
    pub fn from_csv_path(path: &Utf8Path) -> Result<Self, SyncomError> {
        let file = std::fs::File::open(path)?;
        AngularStatistics::from_csv_reader(file)
    }

    /// Smooth both fields over `smoothing_bins` and rotate them by `rotation_bins`.
    pub fn prepare(&self, smoothing_bins: usize, rotation_bins: isize) -> AngularStatistics {
        AngularStatistics {
            velocity: self.velocity.smoothed(smoothing_bins).rotated(rotation_bins),
            period: self
                .period
                .as_ref()
                .map(|p| p.smoothed(smoothing_bins).rotated(rotation_bins)),
        }
    }

    /// Period at a position angle, falling back to `default_period` when the dataset has none.
    pub fn period_at(&self, angle: DegTenths, default_period: f64) -> f64 {
        self.period
            .as_ref()
            .map_or(default_period, |p| p.value_at(angle))
    }
}
