#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Load-cell sensing core (hardware-agnostic).
//!
//! All hardware interaction goes through `loadcell_traits::LoadCell`.
//!
//! ## Architecture
//!
//! - **Calibration**: linear raw→grams model, tare and fits (`calibration`)
//! - **Filtering**: moving average, adaptive Kalman with step boosting,
//!   adaptive-window median (`filter`)
//! - **Acquisition**: fixed-rate sampling thread, bounded queue, auto-tare
//!   (`acquisition`)
//! - **Detection**: Empty/Stabilizing/Stable/Removing classifier (`detection`)
//! - **Manager**: debounced wake/measure/sleep lifecycle (`manager`)
//! - **Runner**: wires the above together behind `ScaleService` (`runner`)
//!
//! Filters operate in ADC counts; grams appear only after calibration.

pub mod acquisition;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod detection;
pub mod error;
pub mod events;
pub mod filter;
pub mod hw_error;
pub mod manager;
pub mod mocks;
pub mod runner;
pub mod sync;
pub mod thresholds;
pub mod types;
pub mod util;

pub use acquisition::{Acquisition, AcquisitionStats};
pub use calibration::{
    CalibrationModel, CalibrationStep, convert, fit_multi_point, fit_single_point, run_procedure,
    tare,
};
pub use config::CoreConfig;
pub use detection::{DetectionEvent, DetectionState, WeightDetector};
pub use error::{CalibrationError, Result, ScaleError};
pub use events::{EventBus, EventKind, WeightEvent};
pub use manager::{ManagerOutput, ManagerState, SleepReason, WeightManager};
pub use runner::{ConsumerStatus, ScaleService};
pub use thresholds::{Threshold, Thresholds};
pub use types::{Snapshot, WeightSample};

use loadcell_traits::{Clock, LoadCell};

use crate::hw_error::map_hw_error;

/// Run the calibration procedure directly on a load cell (no acquisition
/// task running). Each read uses `read_timeout`.
pub fn calibrate_load_cell<L: LoadCell + ?Sized, C: Clock>(
    cell: &mut L,
    clock: &C,
    cfg: &config::CalibrationCfg,
    read_timeout: std::time::Duration,
    known_weight_g: f32,
    prompt: impl FnMut(CalibrationStep),
) -> std::result::Result<CalibrationModel, CalibrationError> {
    run_procedure(
        || cell.read_raw(read_timeout).map_err(|e| map_hw_error(&*e)),
        clock,
        cfg,
        known_weight_g,
        prompt,
    )
}

/// Average `samples` raw reads for a startup zero (tare) directly on a load cell.
pub fn tare_load_cell<L: LoadCell + ?Sized, C: Clock>(
    cell: &mut L,
    clock: &C,
    cfg: &config::CalibrationCfg,
    read_timeout: std::time::Duration,
) -> std::result::Result<i32, CalibrationError> {
    let mut raws = Vec::with_capacity(cfg.tare_samples);
    let mut failures = 0u32;
    while raws.len() < cfg.tare_samples {
        match cell.read_raw(read_timeout) {
            Ok(v) => {
                raws.push(v);
                clock.sleep(cfg.sample_interval);
            }
            Err(e) => {
                failures += 1;
                if failures > cfg.max_read_failures {
                    return Err(CalibrationError::Acquisition(map_hw_error(&*e).to_string()));
                }
            }
        }
    }
    tare(&raws)
}
