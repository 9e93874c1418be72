//! `From` implementations bridging `loadcell_config` types to `loadcell_core` types.

use std::time::Duration;

use crate::calibration::{CalibrationModel, fit_multi_point};
use crate::config::{
    AcquisitionCfg, AutoTareCfg, CalibrationCfg, CoreConfig, DetectionCfg, FilterCfg, ManagerCfg,
};
use crate::error::CalibrationError;
use crate::filter::{BoostParams, FilterMode, KalmanParams, MedianParams};

/// Negative window sizes mean "stage disabled".
fn window(n: i32) -> usize {
    usize::try_from(n).unwrap_or(0)
}

// ── FilterCfg ────────────────────────────────────────────────────────────────

impl From<loadcell_config::FilterMode> for FilterMode {
    fn from(m: loadcell_config::FilterMode) -> Self {
        match m {
            loadcell_config::FilterMode::Smoothing => Self::Smoothing,
            loadcell_config::FilterMode::Median => Self::Median,
        }
    }
}

impl From<&loadcell_config::KalmanCfg> for KalmanParams {
    fn from(c: &loadcell_config::KalmanCfg) -> Self {
        Self {
            q: c.q,
            r: c.r,
            q_min: c.q_min,
            q_max: c.q_max,
            r_min: c.r_min,
            r_max: c.r_max,
            innovation_threshold: c.innovation_threshold,
        }
    }
}

impl From<&loadcell_config::BoostCfg> for BoostParams {
    fn from(c: &loadcell_config::BoostCfg) -> Self {
        Self {
            step_threshold: c.step_threshold,
            boosted_q: c.boosted_q,
            normal_q: c.normal_q,
            samples: c.samples,
        }
    }
}

impl From<&loadcell_config::MedianCfg> for MedianParams {
    fn from(c: &loadcell_config::MedianCfg) -> Self {
        Self {
            min_samples: window(c.min_samples),
            max_samples: window(c.max_samples),
            step_increase: c.step_increase as usize,
            step_pct: c.step_pct,
        }
    }
}

impl From<&loadcell_config::FilterCfg> for FilterCfg {
    fn from(c: &loadcell_config::FilterCfg) -> Self {
        Self {
            mode: c.mode.into(),
            ma_window: window(c.ma_window),
            kalman: c.kalman.enabled.then(|| KalmanParams::from(&c.kalman)),
            boost: BoostParams::from(&c.boost),
            median: MedianParams::from(&c.median),
        }
    }
}

// ── Acquisition / auto-tare ──────────────────────────────────────────────────

impl From<&loadcell_config::AcquisitionCfg> for AcquisitionCfg {
    fn from(c: &loadcell_config::AcquisitionCfg) -> Self {
        Self {
            sample_rate_hz: c.sample_rate_hz,
            queue_capacity: c.queue_capacity,
            read_timeout: Duration::from_millis(c.read_timeout_ms),
            lock_timeout: Duration::from_millis(c.lock_timeout_ms),
        }
    }
}

impl From<&loadcell_config::AutoTareCfg> for AutoTareCfg {
    fn from(c: &loadcell_config::AutoTareCfg) -> Self {
        Self {
            band_g: c.band_g,
            count: c.count,
        }
    }
}

// ── State machines ───────────────────────────────────────────────────────────

impl From<&loadcell_config::DetectionCfg> for DetectionCfg {
    fn from(c: &loadcell_config::DetectionCfg) -> Self {
        Self {
            presence_threshold_g: c.presence_threshold_g,
            change_threshold_pct: c.change_threshold_pct,
            stable_readings_required: c.stable_readings_required,
            stabilization_timeout_ms: c.stabilization_timeout_ms,
            removal_confirmation_ms: c.removal_confirmation_ms,
        }
    }
}

impl From<&loadcell_config::ManagerCfg> for ManagerCfg {
    fn from(c: &loadcell_config::ManagerCfg) -> Self {
        Self {
            wake_threshold_g: c.wake_threshold_g,
            sleep_threshold_g: c.sleep_threshold_g,
            debounce_count: c.debounce_count,
            active_timeout_ms: c.active_timeout_ms,
            status_interval_ms: c.status_interval_ms,
            sane_bound_g: c.sane_bound_g,
        }
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl From<&loadcell_config::CalibrationCfg> for CalibrationCfg {
    fn from(c: &loadcell_config::CalibrationCfg) -> Self {
        Self {
            tare_samples: c.tare_samples,
            known_samples: c.known_samples,
            sample_interval: Duration::from_millis(c.tare_interval_ms),
            settle: Duration::from_millis(c.settle_ms),
            known_weight_g: c.known_weight_g,
            ..CalibrationCfg::default()
        }
    }
}

impl TryFrom<&[loadcell_config::CalibrationRow]> for CalibrationModel {
    type Error = CalibrationError;

    fn try_from(rows: &[loadcell_config::CalibrationRow]) -> Result<Self, Self::Error> {
        let raw: Vec<i32> = rows.iter().map(|r| r.raw).collect();
        let grams: Vec<f32> = rows.iter().map(|r| r.grams).collect();
        fit_multi_point(&raw, &grams)
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&loadcell_config::Config> for CoreConfig {
    fn from(c: &loadcell_config::Config) -> Self {
        Self {
            acquisition: AcquisitionCfg::from(&c.acquisition),
            filter: FilterCfg::from(&c.filter),
            auto_tare: AutoTareCfg::from(&c.auto_tare),
            detection: DetectionCfg::from(&c.detection),
            manager: ManagerCfg::from(&c.manager),
            calibration: CalibrationCfg::from(&c.calibration),
        }
    }
}
