//! Weight-state events and best-effort fan-out to listeners.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local, Utc};
use crossbeam_channel as xch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Added,
    Removed,
    Stable,
    /// Rate-limited reading while the manager is active.
    Status,
}

impl EventKind {
    /// Upper-case label used in log rows.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Added => "WEIGHT_ADDED",
            Self::Removed => "WEIGHT_REMOVED",
            Self::Stable => "WEIGHT_STABLE",
            Self::Status => "WEIGHT_STATUS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightEvent {
    pub kind: EventKind,
    pub weight_g: f32,
    /// Sample timestamp (ms since acquisition start).
    pub timestamp_ms: u64,
    pub wall_time: DateTime<Utc>,
}

impl WeightEvent {
    pub fn new(kind: EventKind, weight_g: f32, timestamp_ms: u64) -> Self {
        Self {
            kind,
            weight_g,
            timestamp_ms,
            wall_time: Utc::now(),
        }
    }

    /// `"<EVENT> | <local time> | <weight> g"`.
    pub fn log_row(&self) -> String {
        let local: DateTime<Local> = self.wall_time.with_timezone(&Local);
        format!(
            "{} | {} | {:.2} g",
            self.kind.label(),
            local.format("%Y-%m-%d %H:%M:%S"),
            self.weight_g
        )
    }
}

/// Fan-out to registered listeners. Delivery is at-most-once: a full
/// listener misses the event, a disconnected one is dropped.
#[derive(Debug)]
pub struct EventBus {
    listeners: Mutex<Vec<xch::Sender<WeightEvent>>>,
    capacity: usize,
    missed: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(32)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
            missed: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> xch::Receiver<WeightEvent> {
        let (tx, rx) = xch::bounded(self.capacity);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn publish(&self, event: &WeightEvent) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(xch::TrySendError::Full(_)) => {
                self.missed.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(xch::TrySendError::Disconnected(_)) => false,
        });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Events a full listener did not receive.
    pub fn missed(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }
}
