#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and calibration table parsing for the load-cell scale.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Calibration CSV loader enforces headers and raw-value sanity; the fit
//!   itself lives in `loadcell_core::calibration`.
use serde::Deserialize;

/// Upper bound for `acquisition.queue_capacity`.
pub const MAX_QUEUE_CAPACITY: usize = 1024;
/// Upper bound for `filter.ma_window` and `filter.median.max_samples`.
pub const MAX_FILTER_WINDOW: i32 = 1024;
/// Upper bound for `calibration.tare_samples` and `calibration.known_samples`.
pub const MAX_CALIBRATION_SAMPLES: usize = 10_000;

/// Calibration CSV schema.
///
/// Expected headers:
/// raw,grams
///
/// Example:
/// raw,grams
/// 842913,0.0
/// 1024913,100.0
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CalibrationRow {
    pub raw: i32,
    pub grams: f32,
}

#[derive(Debug, Deserialize)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    /// 128 (channel A), 64 (channel A) or 32 (channel B)
    #[serde(default = "default_gain")]
    pub gain: u32,
}

const fn default_gain() -> u32 {
    128
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AcquisitionCfg {
    pub sample_rate_hz: u32,
    pub queue_capacity: usize,
    /// Max time to wait for HX711 data-ready (DT low) before failing
    pub read_timeout_ms: u64,
    /// Sleep between data-ready polls (0 spins)
    pub poll_interval_us: u64,
    pub lock_timeout_ms: u64,
}

impl Default for AcquisitionCfg {
    fn default() -> Self {
        Self {
            sample_rate_hz: 100,
            queue_capacity: 10,
            read_timeout_ms: 150,
            poll_interval_us: 200,
            lock_timeout_ms: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Moving average followed by the adaptive Kalman stage.
    #[default]
    Smoothing,
    /// Adaptive-window median on raw counts.
    Median,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KalmanCfg {
    pub enabled: bool,
    pub q: f32,
    pub r: f32,
    pub q_min: f32,
    pub q_max: f32,
    pub r_min: f32,
    pub r_max: f32,
    pub innovation_threshold: f32,
}

impl Default for KalmanCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            q: 0.5,
            r: 1.0,
            q_min: 0.001,
            q_max: 1.0,
            r_min: 0.5,
            r_max: 5.0,
            innovation_threshold: 10.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BoostCfg {
    /// Raw-count jump that counts as a step change
    pub step_threshold: f32,
    pub boosted_q: f32,
    pub normal_q: f32,
    pub samples: u32,
}

impl Default for BoostCfg {
    fn default() -> Self {
        Self {
            step_threshold: 1000.0,
            boosted_q: 10.0,
            normal_q: 0.5,
            samples: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MedianCfg {
    pub min_samples: i32,
    /// <= 0 disables the median stage
    pub max_samples: i32,
    pub step_increase: u32,
    /// Relative change (percent of last output) treated as a step
    pub step_pct: f32,
}

impl Default for MedianCfg {
    fn default() -> Self {
        Self {
            min_samples: 3,
            max_samples: 15,
            step_increase: 4,
            step_pct: 5.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FilterCfg {
    pub mode: FilterMode,
    /// <= 0 disables the moving-average stage
    pub ma_window: i32,
    pub kalman: KalmanCfg,
    pub boost: BoostCfg,
    pub median: MedianCfg,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            mode: FilterMode::Smoothing,
            ma_window: 8,
            kalman: KalmanCfg::default(),
            boost: BoostCfg::default(),
            median: MedianCfg::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AutoTareCfg {
    pub band_g: f32,
    /// Consecutive near-zero readings before re-zeroing (0 disables)
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

#[derive(Debug, Deserialize)]
#[serde(default)]
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ManagerCfg {
    pub wake_threshold_g: f32,
    pub sleep_threshold_g: f32,
    pub debounce_count: u32,
    pub active_timeout_ms: u64,
    pub status_interval_ms: u64,
    /// Readings at or beyond this magnitude are treated as a fault
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    pub tare_samples: usize,
    pub tare_interval_ms: u64,
    /// Time given to the operator to place the known weight
    pub settle_ms: u64,
    pub known_samples: usize,
    pub known_weight_g: f32,
    /// Nominal scale factor used with a startup tare when no table is given
    pub g_per_count: Option<f32>,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            tare_samples: 16,
            tare_interval_ms: 20,
            settle_ms: 5000,
            known_samples: 8,
            known_weight_g: 200.0,
            g_per_count: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub acquisition: AcquisitionCfg,
    #[serde(default)]
    pub filter: FilterCfg,
    #[serde(default)]
    pub auto_tare: AutoTareCfg,
    #[serde(default)]
    pub detection: DetectionCfg,
    #[serde(default)]
    pub manager: ManagerCfg,
    #[serde(default)]
    pub calibration: CalibrationCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read calibration rows from a `raw,grams` CSV.
///
/// Rows must contain at least two distinct raw values; the least-squares fit
/// is done by the caller.
pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<Vec<CalibrationRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["raw", "grams"];
    let actual: Vec<String> = headers.iter().map(ToString::to_string).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'raw,grams', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => {
                if !row.grams.is_finite() {
                    eyre::bail!("invalid CSV row {}: grams must be finite", idx + 2);
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    if rows.len() < 2 {
        eyre::bail!("calibration requires at least two rows, got {}", rows.len());
    }
    let first = rows[0].raw;
    if rows.iter().all(|r| r.raw == first) {
        eyre::bail!("calibration rows all share raw value {first}; cannot determine slope");
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.hx711_dt == self.pins.hx711_sck {
            eyre::bail!("pins.hx711_dt and pins.hx711_sck must differ");
        }
        if !matches!(self.pins.gain, 128 | 64 | 32) {
            eyre::bail!("pins.gain must be one of 128, 64, 32");
        }

        // Acquisition
        let acq = &self.acquisition;
        if acq.sample_rate_hz == 0 {
            eyre::bail!("acquisition.sample_rate_hz must be > 0");
        }
        if acq.sample_rate_hz > 1000 {
            eyre::bail!("acquisition.sample_rate_hz must be <= 1000");
        }
        if acq.queue_capacity == 0 {
            eyre::bail!("acquisition.queue_capacity must be >= 1");
        }
        if acq.queue_capacity > MAX_QUEUE_CAPACITY {
            eyre::bail!("acquisition.queue_capacity must be <= {MAX_QUEUE_CAPACITY}");
        }
        if acq.read_timeout_ms == 0 {
            eyre::bail!("acquisition.read_timeout_ms must be >= 1");
        }
        if acq.lock_timeout_ms == 0 {
            eyre::bail!("acquisition.lock_timeout_ms must be >= 1");
        }
        if acq.poll_interval_us > acq.read_timeout_ms.saturating_mul(1000) {
            eyre::bail!("acquisition.poll_interval_us must not exceed read_timeout_ms");
        }

        // Filter
        if self.filter.ma_window > MAX_FILTER_WINDOW {
            eyre::bail!("filter.ma_window must be <= {MAX_FILTER_WINDOW}");
        }
        let k = &self.filter.kalman;
        if k.enabled {
            if !(k.q_min > 0.0 && k.q_min <= k.q_max) {
                eyre::bail!("filter.kalman.q_min must be > 0 and <= q_max");
            }
            if !(k.r_min > 0.0 && k.r_min <= k.r_max) {
                eyre::bail!("filter.kalman.r_min must be > 0 and <= r_max");
            }
            if !(k.q.is_finite() && k.q > 0.0) || !(k.r.is_finite() && k.r > 0.0) {
                eyre::bail!("filter.kalman.q and filter.kalman.r must be > 0");
            }
            if !(k.innovation_threshold.is_finite() && k.innovation_threshold >= 0.0) {
                eyre::bail!("filter.kalman.innovation_threshold must be >= 0");
            }
        }
        let b = &self.filter.boost;
        if !(b.step_threshold.is_finite() && b.step_threshold > 0.0) {
            eyre::bail!("filter.boost.step_threshold must be > 0");
        }
        if !(b.boosted_q.is_finite() && b.boosted_q > 0.0) {
            eyre::bail!("filter.boost.boosted_q must be > 0");
        }
        if !(b.normal_q.is_finite() && b.normal_q > 0.0) {
            eyre::bail!("filter.boost.normal_q must be > 0");
        }
        let m = &self.filter.median;
        if m.max_samples > MAX_FILTER_WINDOW {
            eyre::bail!("filter.median.max_samples must be <= {MAX_FILTER_WINDOW}");
        }
        if m.max_samples > 0 {
            if m.min_samples < 1 || m.min_samples > m.max_samples {
                eyre::bail!("filter.median.min_samples must be in [1, max_samples]");
            }
            if !(m.step_pct.is_finite() && m.step_pct > 0.0) {
                eyre::bail!("filter.median.step_pct must be > 0");
            }
        }
        if self.filter.mode == FilterMode::Median && m.max_samples <= 0 {
            eyre::bail!("filter.mode = \"median\" requires filter.median.max_samples > 0");
        }

        // Auto-tare
        if !(self.auto_tare.band_g.is_finite() && self.auto_tare.band_g >= 0.0) {
            eyre::bail!("auto_tare.band_g must be >= 0");
        }

        // Detection
        let d = &self.detection;
        if !(d.presence_threshold_g.is_finite() && d.presence_threshold_g >= 0.0) {
            eyre::bail!("detection.presence_threshold_g must be >= 0");
        }
        if !(d.change_threshold_pct > 0.0 && d.change_threshold_pct <= 100.0) {
            eyre::bail!("detection.change_threshold_pct must be in (0, 100]");
        }
        if d.stable_readings_required == 0 {
            eyre::bail!("detection.stable_readings_required must be >= 1");
        }

        // Manager
        let mg = &self.manager;
        if !(mg.wake_threshold_g.is_finite() && mg.sleep_threshold_g.is_finite()) {
            eyre::bail!("manager thresholds must be finite");
        }
        if mg.sleep_threshold_g > mg.wake_threshold_g {
            eyre::bail!("manager.sleep_threshold_g must be <= manager.wake_threshold_g");
        }
        if mg.debounce_count == 0 {
            eyre::bail!("manager.debounce_count must be >= 1");
        }
        if mg.active_timeout_ms == 0 {
            eyre::bail!("manager.active_timeout_ms must be >= 1");
        }
        if !(mg.sane_bound_g > mg.wake_threshold_g) {
            eyre::bail!("manager.sane_bound_g must be > manager.wake_threshold_g");
        }

        // Calibration
        let c = &self.calibration;
        if !(1..=MAX_CALIBRATION_SAMPLES).contains(&c.tare_samples) {
            eyre::bail!("calibration.tare_samples must be in [1, {MAX_CALIBRATION_SAMPLES}]");
        }
        if !(1..=MAX_CALIBRATION_SAMPLES).contains(&c.known_samples) {
            eyre::bail!("calibration.known_samples must be in [1, {MAX_CALIBRATION_SAMPLES}]");
        }
        if !(c.known_weight_g.is_finite() && c.known_weight_g > 0.0) {
            eyre::bail!("calibration.known_weight_g must be > 0");
        }
        if let Some(g) = c.g_per_count
            && !(g.is_finite() && g != 0.0)
        {
            eyre::bail!("calibration.g_per_count must be finite and non-zero");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}
