//! Presence / stability classifier over individual filtered readings.
//!
//! Empty → Stabilizing → Stable → Removing → Empty, with debounce counts
//! and timeouts measured from the time the current state was entered.
//! Time comes from the sample timestamps, so the machine is deterministic.
use tracing::debug;

use crate::config::DetectionCfg;
use crate::util::pct_change;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionState {
    #[default]
    Empty,
    Stabilizing,
    Stable,
    Removing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionEvent {
    /// A new weight settled.
    Stable { weight_g: f32 },
    /// The settled weight was removed (confirmation time elapsed).
    Removed { last_weight_g: f32 },
}

#[derive(Debug, Clone)]
pub struct WeightDetector {
    cfg: DetectionCfg,
    state: DetectionState,
    current_weight_g: f32,
    stable_weight_g: f32,
    state_entry_ms: u64,
    stable_reading_count: u32,
    pending_event: bool,
}

impl WeightDetector {
    pub fn new(cfg: DetectionCfg) -> Self {
        Self {
            cfg,
            state: DetectionState::Empty,
            current_weight_g: 0.0,
            stable_weight_g: 0.0,
            state_entry_ms: 0,
            stable_reading_count: 0,
            pending_event: false,
        }
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn current_weight_g(&self) -> f32 {
        self.current_weight_g
    }

    pub fn stable_weight_g(&self) -> f32 {
        self.stable_weight_g
    }

    pub fn stable_reading_count(&self) -> u32 {
        self.stable_reading_count
    }

    pub fn set_presence_threshold(&mut self, grams: f32) {
        self.cfg.presence_threshold_g = grams;
    }

    pub fn set_change_threshold_pct(&mut self, pct: f32) {
        self.cfg.change_threshold_pct = pct;
    }

    /// Returns and clears the "new event" flag.
    pub fn take_event_flag(&mut self) -> bool {
        std::mem::take(&mut self.pending_event)
    }

    /// Back to Empty with all bookkeeping cleared.
    pub fn reset(&mut self, now_ms: u64) {
        *self = Self {
            state_entry_ms: now_ms,
            ..Self::new(self.cfg)
        };
    }

    fn enter(&mut self, state: DetectionState, now_ms: u64) {
        debug!(from = ?self.state, to = ?state, weight_g = self.current_weight_g, "detection transition");
        self.state = state;
        self.state_entry_ms = now_ms;
    }

    /// Feed one reading. At most one event results.
    pub fn process(&mut self, weight_g: f32, now_ms: u64) -> Option<DetectionEvent> {
        if !weight_g.is_finite() {
            return None;
        }
        let previous = self.current_weight_g;
        self.current_weight_g = weight_g;
        let presence = self.cfg.presence_threshold_g;
        let change = self.cfg.change_threshold_pct;
        let mut event = None;

        match self.state {
            DetectionState::Empty => {
                if weight_g > presence {
                    self.stable_reading_count = 1;
                    self.enter(DetectionState::Stabilizing, now_ms);
                }
            }
            DetectionState::Stabilizing => {
                if weight_g <= presence {
                    self.stable_reading_count = 0;
                    self.enter(DetectionState::Empty, now_ms);
                } else if pct_change(weight_g, previous) < change {
                    self.stable_reading_count += 1;
                    if self.stable_reading_count >= self.cfg.stable_readings_required {
                        self.stable_weight_g = weight_g;
                        self.pending_event = true;
                        self.enter(DetectionState::Stable, now_ms);
                        event = Some(DetectionEvent::Stable { weight_g });
                    }
                } else {
                    self.stable_reading_count = 1;
                }
            }
            DetectionState::Stable => {
                if weight_g < presence {
                    self.enter(DetectionState::Removing, now_ms);
                } else if pct_change(weight_g, self.stable_weight_g) > change {
                    self.stable_reading_count = 1;
                    self.enter(DetectionState::Stabilizing, now_ms);
                } else {
                    self.stable_weight_g = weight_g;
                }
            }
            DetectionState::Removing => {
                if weight_g >= presence {
                    self.enter(DetectionState::Stable, now_ms);
                }
            }
        }

        // single timeout checkpoint per reading
        let in_state = now_ms.saturating_sub(self.state_entry_ms);
        match self.state {
            DetectionState::Stabilizing if in_state > self.cfg.stabilization_timeout_ms => {
                debug!(in_state, "stabilization timed out");
                self.stable_reading_count = 0;
                self.enter(DetectionState::Empty, now_ms);
            }
            DetectionState::Removing if in_state >= self.cfg.removal_confirmation_ms => {
                let last_weight_g = self.stable_weight_g;
                self.stable_weight_g = 0.0;
                self.stable_reading_count = 0;
                self.pending_event = true;
                self.enter(DetectionState::Empty, now_ms);
                event = Some(DetectionEvent::Removed { last_weight_g });
            }
            _ => {}
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_presence_stays_empty() {
        let mut d = WeightDetector::new(DetectionCfg::default());
        for t in 0..20 {
            assert_eq!(d.process(9.5, t * 10), None);
        }
        assert_eq!(d.state(), DetectionState::Empty);
        assert!((d.current_weight_g() - 9.5).abs() < f32::EPSILON);
    }

    #[test]
    fn stable_weight_tracks_small_drift() {
        let mut d = WeightDetector::new(DetectionCfg::default());
        for (i, w) in [100.0, 100.0, 100.0].into_iter().enumerate() {
            d.process(w, i as u64 * 10);
        }
        assert_eq!(d.state(), DetectionState::Stable);
        d.process(103.0, 40);
        assert_eq!(d.state(), DetectionState::Stable);
        assert!((d.stable_weight_g() - 103.0).abs() < f32::EPSILON);
    }
}
