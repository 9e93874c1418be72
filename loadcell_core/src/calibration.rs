//! Linear raw→grams model, tare and least-squares fitting.
//!
//! All fits are pure; `run_procedure` drives the operator-facing
//! tare / place weight / measure sequence over any raw-sample source.
use loadcell_traits::Clock;
use tracing::{debug, info, warn};

use crate::config::CalibrationCfg;
use crate::error::{CalibrationError, ScaleError};

/// `grams = slope * raw + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationModel {
    pub slope: f32,
    pub intercept: f32,
}

impl Default for CalibrationModel {
    /// Identity model (grams == counts) until calibrated.
    fn default() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
        }
    }
}

impl CalibrationModel {
    pub fn new(slope: f32, intercept: f32) -> Result<Self, CalibrationError> {
        if !slope.is_finite() || slope == 0.0 || !intercept.is_finite() {
            return Err(CalibrationError::InvalidSlope);
        }
        Ok(Self { slope, intercept })
    }

    /// Model with the given scale factor whose zero sits at `zero_counts`.
    pub fn from_zero(slope: f32, zero_counts: f32) -> Result<Self, CalibrationError> {
        Self::new(slope, -slope * zero_counts)
    }

    #[inline]
    pub fn convert(&self, raw: i32) -> f32 {
        self.convert_counts(raw as f32)
    }

    /// Convert a (possibly filtered, fractional) count value.
    #[inline]
    pub fn convert_counts(&self, counts: f32) -> f32 {
        (f64::from(self.slope) * f64::from(counts) + f64::from(self.intercept)) as f32
    }

    /// Raw count that maps to 0 g.
    pub fn zero_counts(&self) -> f32 {
        -self.intercept / self.slope
    }

    /// Same slope, re-zeroed at `zero_counts`.
    #[must_use]
    pub fn with_zero(self, zero_counts: f32) -> Self {
        Self {
            slope: self.slope,
            intercept: -self.slope * zero_counts,
        }
    }
}

/// `model.slope * raw + model.intercept`.
#[inline]
pub fn convert(model: &CalibrationModel, raw: i32) -> f32 {
    model.convert(raw)
}

/// Mean of `samples` (rounded to nearest), accumulated in 64 bits.
pub fn tare(samples: &[i32]) -> Result<i32, CalibrationError> {
    if samples.is_empty() {
        return Err(CalibrationError::EmptyInput);
    }
    let sum: i64 = samples.iter().map(|&s| i64::from(s)).sum();
    let mean = (sum as f64 / samples.len() as f64).round();
    Ok(mean as i32)
}

pub fn fit_single_point(
    zero_raw: i32,
    raw_at_known: i32,
    known_weight_g: f32,
) -> Result<CalibrationModel, CalibrationError> {
    if known_weight_g == 0.0 {
        return Err(CalibrationError::DegenerateWeight);
    }
    let span = i64::from(raw_at_known) - i64::from(zero_raw);
    if span == 0 {
        return Err(CalibrationError::DegenerateSpan { raw: raw_at_known });
    }
    let slope = f64::from(known_weight_g) / span as f64;
    let intercept = -slope * f64::from(zero_raw);
    CalibrationModel::new(slope as f32, intercept as f32)
}

/// Ordinary least squares over paired samples, computed in f64.
pub fn fit_multi_point(raw: &[i32], weights: &[f32]) -> Result<CalibrationModel, CalibrationError> {
    if raw.len() != weights.len() {
        return Err(CalibrationError::LengthMismatch {
            raw: raw.len(),
            weights: weights.len(),
        });
    }
    if raw.len() < 2 {
        return Err(CalibrationError::InsufficientPoints { got: raw.len() });
    }
    let n = raw.len() as f64;
    let mean_x = raw.iter().map(|&x| f64::from(x)).sum::<f64>() / n;
    let mean_y = weights.iter().map(|&y| f64::from(y)).sum::<f64>() / n;
    let mut sxx = 0.0f64;
    let mut sxy = 0.0f64;
    for (&x, &y) in raw.iter().zip(weights) {
        let dx = f64::from(x) - mean_x;
        sxx += dx * dx;
        sxy += dx * (f64::from(y) - mean_y);
    }
    if sxx == 0.0 {
        return Err(CalibrationError::DegenerateInput);
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    CalibrationModel::new(slope as f32, intercept as f32)
}

/// Operator-facing steps of the calibration procedure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStep {
    /// Scale must be empty; zero reading is being averaged.
    ClearScale,
    /// Place `known_weight_g` on the scale now.
    PlaceWeight { known_weight_g: f32 },
    /// Reading the known weight.
    Measuring,
    Done(CalibrationModel),
}

/// Tare, prompt for the known weight, wait, measure and fit a single point.
///
/// `read` yields one raw conversion per call. Individual read failures are
/// retried up to `cfg.max_read_failures` times in total.
pub fn run_procedure<C: Clock>(
    mut read: impl FnMut() -> Result<i32, ScaleError>,
    clock: &C,
    cfg: &CalibrationCfg,
    known_weight_g: f32,
    mut prompt: impl FnMut(CalibrationStep),
) -> Result<CalibrationModel, CalibrationError> {
    if known_weight_g == 0.0 || !known_weight_g.is_finite() {
        return Err(CalibrationError::DegenerateWeight);
    }
    let mut failures: u32 = 0;
    let mut collect = |count: usize, label: &str| -> Result<Vec<i32>, CalibrationError> {
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            match read() {
                Ok(raw) => {
                    out.push(raw);
                    if out.len() < count {
                        clock.sleep(cfg.sample_interval);
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, failures, phase = label, "calibration read failed");
                    if failures > cfg.max_read_failures {
                        return Err(CalibrationError::Acquisition(e.to_string()));
                    }
                }
            }
        }
        Ok(out)
    };

    prompt(CalibrationStep::ClearScale);
    let zero_raw = tare(&collect(cfg.tare_samples, "tare")?)?;
    debug!(zero_raw, "calibration tare complete");

    prompt(CalibrationStep::PlaceWeight { known_weight_g });
    clock.sleep(cfg.settle);

    prompt(CalibrationStep::Measuring);
    let raw_known = tare(&collect(cfg.known_samples, "known")?)?;
    let model = fit_single_point(zero_raw, raw_known, known_weight_g)?;
    info!(
        zero_raw,
        raw_known,
        known_weight_g,
        slope = model.slope,
        intercept = model.intercept,
        "calibration complete"
    );
    prompt(CalibrationStep::Done(model));
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tare_rounds_to_nearest() {
        assert_eq!(tare(&[1, 2]), Ok(2));
        assert_eq!(tare(&[-1, -2]), Ok(-2));
        assert_eq!(tare(&[i32::MAX, i32::MAX]), Ok(i32::MAX));
    }

    #[test]
    fn with_zero_keeps_slope() {
        let m = CalibrationModel::new(0.5, -50.0).unwrap();
        assert!((m.zero_counts() - 100.0).abs() < 1e-6);
        let z = m.with_zero(120.0);
        assert!((z.slope - 0.5).abs() < f32::EPSILON);
        assert!(z.convert(120).abs() < 1e-6);
    }

    #[test]
    fn new_rejects_zero_slope() {
        assert_eq!(
            CalibrationModel::new(0.0, 1.0),
            Err(CalibrationError::InvalidSlope)
        );
        assert!(CalibrationModel::new(f32::NAN, 0.0).is_err());
    }
}
