//! Runtime-adjustable thresholds shared between the acquisition task,
//! the consumers and external configuration endpoints.
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::config::CoreConfig;
use crate::error::ScaleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Threshold {
    /// Manager wake threshold (g).
    Wake,
    /// Manager sleep threshold (g).
    Sleep,
    /// Filter step threshold (counts).
    Step,
    /// Detection presence threshold (g).
    Presence,
    /// Detection change threshold (percent).
    ChangePct,
    /// Auto-tare at-rest band (g).
    AutoTareBand,
}

impl Threshold {
    pub const ALL: [Self; 6] = [
        Self::Wake,
        Self::Sleep,
        Self::Step,
        Self::Presence,
        Self::ChangePct,
        Self::AutoTareBand,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Wake => "wake",
            Self::Sleep => "sleep",
            Self::Step => "step",
            Self::Presence => "presence",
            Self::ChangePct => "change_pct",
            Self::AutoTareBand => "auto_tare_band",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }

    fn accepts(self, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            Self::Step => value > 0.0,
            Self::ChangePct => value > 0.0 && value <= 100.0,
            _ => value >= 0.0,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Threshold {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.name() == key)
            .ok_or_else(|| ScaleError::UnknownThreshold(s.to_string()))
    }
}

/// Lock-free threshold table (f32 bits in atomics).
///
/// Reads never block. Writes are serialized so the wake/sleep pair is
/// checked against a consistent snapshot: `sleep <= wake < sane_bound_g`.
#[derive(Debug)]
pub struct Thresholds {
    values: [AtomicU32; 6],
    sane_bound_g: f32,
    write: Mutex<()>,
}

impl Thresholds {
    pub fn from_config(cfg: &CoreConfig) -> Self {
        let init = |t: Threshold| -> f32 {
            match t {
                Threshold::Wake => cfg.manager.wake_threshold_g,
                Threshold::Sleep => cfg.manager.sleep_threshold_g,
                Threshold::Step => cfg.filter.boost.step_threshold,
                Threshold::Presence => cfg.detection.presence_threshold_g,
                Threshold::ChangePct => cfg.detection.change_threshold_pct,
                Threshold::AutoTareBand => cfg.auto_tare.band_g,
            }
        };
        Self {
            values: Threshold::ALL.map(|t| AtomicU32::new(init(t).to_bits())),
            sane_bound_g: cfg.manager.sane_bound_g,
            write: Mutex::new(()),
        }
    }

    /// Cross-checks against the thresholds `t` is paired with.
    fn consistent(&self, t: Threshold, value: f32) -> bool {
        match t {
            Threshold::Wake => value >= self.get(Threshold::Sleep) && value < self.sane_bound_g,
            Threshold::Sleep => value <= self.get(Threshold::Wake),
            _ => true,
        }
    }

    #[inline]
    pub fn get(&self, t: Threshold) -> f32 {
        f32::from_bits(self.values[t.index()].load(Ordering::Relaxed))
    }

    pub fn set(&self, t: Threshold, value: f32) -> Result<(), ScaleError> {
        let _guard = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        if !t.accepts(value) || !self.consistent(t, value) {
            return Err(ScaleError::InvalidThreshold {
                name: t.name(),
                value,
            });
        }
        self.values[t.index()].store(value.to_bits(), Ordering::Relaxed);
        tracing::info!(threshold = t.name(), value, "threshold updated");
        Ok(())
    }

    pub fn set_by_name(&self, name: &str, value: f32) -> Result<(), ScaleError> {
        self.set(name.parse()?, value)
    }

    pub fn get_by_name(&self, name: &str) -> Result<f32, ScaleError> {
        Ok(self.get(name.parse()?))
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from_config(&CoreConfig::default())
    }
}
