//! Debounced idle/active lifecycle over the calibrated weight stream.
//!
//! NoWeight → DebounceAdd → Measuring → DebounceRemove → NoWeight, plus an
//! Error state for insane readings. Wake needs `debounce_count` consecutive
//! readings at or above the wake threshold; sleep needs as many at or below
//! the sleep threshold, or `active_timeout_ms` without a reading at or above
//! the wake threshold.
use tracing::{debug, info, warn};

use crate::config::ManagerCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManagerState {
    #[default]
    NoWeight,
    DebounceAdd,
    Measuring,
    DebounceRemove,
    Error,
}

impl ManagerState {
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Measuring | Self::DebounceRemove)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepReason {
    BelowThreshold,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManagerOutput {
    Wake { weight_g: f32 },
    Sleep { weight_g: f32, reason: SleepReason },
    /// Rate-limited periodic reading while active.
    Status { weight_g: f32 },
}

#[derive(Debug, Clone)]
pub struct WeightManager {
    cfg: ManagerCfg,
    state: ManagerState,
    debounce_count: u32,
    last_event_ms: u64,
    /// Last active reading at or above the wake threshold.
    last_activity_ms: u64,
    last_status_ms: Option<u64>,
    /// After a timeout sleep the load must drop to the sleep threshold
    /// before another wake is allowed.
    needs_rearm: bool,
}

impl WeightManager {
    pub fn new(cfg: ManagerCfg) -> Self {
        Self {
            cfg,
            state: ManagerState::NoWeight,
            debounce_count: 0,
            last_event_ms: 0,
            last_activity_ms: 0,
            last_status_ms: None,
            needs_rearm: false,
        }
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn debounce_count(&self) -> u32 {
        self.debounce_count
    }

    pub fn last_event_ms(&self) -> u64 {
        self.last_event_ms
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms
    }

    pub fn set_wake_threshold(&mut self, grams: f32) {
        self.cfg.wake_threshold_g = grams;
    }

    pub fn set_sleep_threshold(&mut self, grams: f32) {
        self.cfg.sleep_threshold_g = grams;
    }

    fn debounce_target(&self) -> u32 {
        self.cfg.debounce_count.max(1)
    }

    fn wake(&mut self, weight_g: f32, now_ms: u64) -> ManagerOutput {
        self.state = ManagerState::Measuring;
        self.debounce_count = 0;
        self.last_event_ms = now_ms;
        self.last_activity_ms = now_ms;
        self.last_status_ms = Some(now_ms);
        info!(weight_g, "scale woke up");
        ManagerOutput::Wake { weight_g }
    }

    fn sleep(&mut self, weight_g: f32, now_ms: u64, reason: SleepReason) -> ManagerOutput {
        self.state = ManagerState::NoWeight;
        self.debounce_count = 0;
        self.last_event_ms = now_ms;
        self.last_status_ms = None;
        self.needs_rearm = reason == SleepReason::Timeout;
        info!(weight_g, ?reason, "scale went to sleep");
        ManagerOutput::Sleep { weight_g, reason }
    }

    fn status(&mut self, weight_g: f32, now_ms: u64) -> Option<ManagerOutput> {
        let due = self
            .last_status_ms
            .is_none_or(|t| now_ms.saturating_sub(t) >= self.cfg.status_interval_ms);
        if !due {
            return None;
        }
        self.last_status_ms = Some(now_ms);
        Some(ManagerOutput::Status { weight_g })
    }

    pub fn process(&mut self, weight_g: f32, now_ms: u64) -> Option<ManagerOutput> {
        if !weight_g.is_finite() || weight_g.abs() >= self.cfg.sane_bound_g {
            if self.state != ManagerState::Error {
                warn!(weight_g, from = ?self.state, "implausible reading, manager in error state");
                self.state = ManagerState::Error;
            }
            return None;
        }

        if self.state.is_active() {
            if weight_g >= self.cfg.wake_threshold_g {
                self.last_activity_ms = now_ms;
            } else if now_ms.saturating_sub(self.last_activity_ms) >= self.cfg.active_timeout_ms {
                return Some(self.sleep(weight_g, now_ms, SleepReason::Timeout));
            }
        }

        let wake = self.cfg.wake_threshold_g;
        let sleep = self.cfg.sleep_threshold_g;
        match self.state {
            ManagerState::Error => {
                self.state = ManagerState::NoWeight;
                self.debounce_count = 0;
                self.needs_rearm = false;
                info!(weight_g, "manager recovered from error state");
                None
            }
            ManagerState::NoWeight => {
                if self.needs_rearm {
                    if weight_g <= sleep {
                        debug!("load cleared, wake re-armed");
                        self.needs_rearm = false;
                    }
                    return None;
                }
                if weight_g < wake {
                    return None;
                }
                self.debounce_count = 1;
                if self.debounce_count >= self.debounce_target() {
                    return Some(self.wake(weight_g, now_ms));
                }
                self.state = ManagerState::DebounceAdd;
                None
            }
            ManagerState::DebounceAdd => {
                if weight_g < wake {
                    self.state = ManagerState::NoWeight;
                    self.debounce_count = 0;
                    return None;
                }
                self.debounce_count += 1;
                if self.debounce_count >= self.debounce_target() {
                    return Some(self.wake(weight_g, now_ms));
                }
                None
            }
            ManagerState::Measuring => {
                if weight_g > sleep {
                    return self.status(weight_g, now_ms);
                }
                self.debounce_count = 1;
                if self.debounce_count >= self.debounce_target() {
                    return Some(self.sleep(weight_g, now_ms, SleepReason::BelowThreshold));
                }
                self.state = ManagerState::DebounceRemove;
                None
            }
            ManagerState::DebounceRemove => {
                if weight_g > sleep {
                    self.state = ManagerState::Measuring;
                    self.debounce_count = 0;
                    return self.status(weight_g, now_ms);
                }
                self.debounce_count += 1;
                if self.debounce_count >= self.debounce_target() {
                    return Some(self.sleep(weight_g, now_ms, SleepReason::BelowThreshold));
                }
                None
            }
        }
    }
}
