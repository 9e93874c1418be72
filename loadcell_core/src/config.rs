//! Runtime configuration for the sensing core.
//!
//! These are the structs the core consumes. They are separate from the
//! TOML-deserialized config in `loadcell_config`; see `conversions`.
use std::time::Duration;

use crate::filter::{BoostParams, FilterMode, FilterPipeline, KalmanParams, MedianParams};

/// Filter cascade configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCfg {
    pub mode: FilterMode,
    /// Moving average window (0 = stage skipped).
    pub ma_window: usize,
    /// `None` skips the Kalman stage.
    pub kalman: Option<KalmanParams>,
    pub boost: BoostParams,
    pub median: MedianParams,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            mode: FilterMode::Smoothing,
            ma_window: 8,
            kalman: Some(KalmanParams::default()),
            boost: BoostParams::default(),
            median: MedianParams::default(),
        }
    }
}

impl FilterCfg {
    pub fn build(&self) -> FilterPipeline {
        FilterPipeline::new(
            self.mode,
            self.ma_window,
            self.kalman,
            self.boost,
            self.median,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionCfg {
    pub sample_rate_hz: u32,
    pub queue_capacity: usize,
    /// Per-read data-ready timeout handed to the load cell.
    pub read_timeout: Duration,
    /// Max wait for the filter or calibration lock before the cycle is skipped.
    pub lock_timeout: Duration,
}

impl Default for AcquisitionCfg {
    fn default() -> Self {
        Self {
            sample_rate_hz: 100,
            queue_capacity: 10,
            read_timeout: Duration::from_millis(150),
            lock_timeout: Duration::from_millis(10),
        }
    }
}

/// Drift compensation: re-zero after `count` consecutive readings within `band_g`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoTareCfg {
    pub band_g: f32,
    /// 0 disables auto-tare.
    pub count: u32,
}

impl Default for AutoTareCfg {
    fn default() -> Self {
        Self {
            band_g: 5.0,
            count: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionCfg {
    pub presence_threshold_g: f32,
    pub change_threshold_pct: f32,
    pub stable_readings_required: u32,
    pub stabilization_timeout_ms: u64,
    pub removal_confirmation_ms: u64,
}

impl Default for DetectionCfg {
    fn default() -> Self {
        Self {
            presence_threshold_g: 10.0,
            change_threshold_pct: 7.0,
            stable_readings_required: 3,
            stabilization_timeout_ms: 2000,
            removal_confirmation_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManagerCfg {
    pub wake_threshold_g: f32,
    pub sleep_threshold_g: f32,
    /// Consecutive readings needed to wake or sleep.
    pub debounce_count: u32,
    pub active_timeout_ms: u64,
    pub status_interval_ms: u64,
    pub sane_bound_g: f32,
}

impl Default for ManagerCfg {
    fn default() -> Self {
        Self {
            wake_threshold_g: 20.0,
            sleep_threshold_g: 10.0,
            debounce_count: 3,
            active_timeout_ms: 60_000,
            status_interval_ms: 100,
            sane_bound_g: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationCfg {
    pub tare_samples: usize,
    pub known_samples: usize,
    /// Spacing between consecutive calibration reads.
    pub sample_interval: Duration,
    /// Operator time to place the known weight.
    pub settle: Duration,
    pub known_weight_g: f32,
    pub max_read_failures: u32,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            tare_samples: 16,
            known_samples: 8,
            sample_interval: Duration::from_millis(20),
            settle: Duration::from_millis(5000),
            known_weight_g: 200.0,
            max_read_failures: 10,
        }
    }
}

/// Everything the running scale needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreConfig {
    pub acquisition: AcquisitionCfg,
    pub filter: FilterCfg,
    pub auto_tare: AutoTareCfg,
    pub detection: DetectionCfg,
    pub manager: ManagerCfg,
    pub calibration: CalibrationCfg,
}
