//! Fixed-rate acquisition task.
//!
//! Spawns a thread that owns the `LoadCell`, runs every reading through the
//! filter pipeline and the calibration model, and publishes the result to a
//! bounded channel. The ADC read happens outside any lock; filter and
//! calibration state are each behind their own short-timeout lock and a busy
//! lock skips the cycle.
//!
//! Each `Acquisition` owns exactly one thread, stopped and joined on drop.
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use loadcell_traits::{Clock, LoadCell};
use tracing::{debug, info, trace, warn};

use crate::calibration::CalibrationModel;
use crate::config::CoreConfig;
use crate::error::ScaleError;
use crate::filter::FilterPipeline;
use crate::hw_error::map_hw_error;
use crate::sync::lock_with_timeout;
use crate::thresholds::{Threshold, Thresholds};
use crate::types::{Snapshot, WeightSample};

/// Counter snapshot for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub samples: u64,
    pub timeouts: u64,
    pub hardware_errors: u64,
    pub lock_timeouts: u64,
    pub dropped: u64,
    pub auto_tares: u64,
    /// Timestamp (ms since start) of the last successful read.
    pub last_ok_ms: u64,
}

#[derive(Debug, Default)]
struct Counters {
    samples: AtomicU64,
    timeouts: AtomicU64,
    hardware_errors: AtomicU64,
    lock_timeouts: AtomicU64,
    dropped: AtomicU64,
    auto_tares: AtomicU64,
    last_ok_ms: AtomicU64,
}

fn bump(c: &AtomicU64) {
    c.fetch_add(1, Ordering::Relaxed);
}

/// Calibration model plus the auto-tare accumulator, guarded together.
#[derive(Debug)]
struct CalibrationState {
    model: CalibrationModel,
    rest_sum: f64,
    rest_count: u32,
}

impl CalibrationState {
    fn new(model: CalibrationModel) -> Self {
        Self {
            model,
            rest_sum: 0.0,
            rest_count: 0,
        }
    }

    fn clear_rest(&mut self) {
        self.rest_sum = 0.0;
        self.rest_count = 0;
    }

    /// Convert `filtered` counts to grams, re-zeroing after `needed`
    /// consecutive readings inside `band_g`. Returns the weight and whether
    /// a re-zero happened.
    fn weigh(&mut self, filtered: f32, band_g: f32, needed: u32) -> (f32, bool) {
        let grams = self.model.convert_counts(filtered);
        if needed == 0 {
            return (grams, false);
        }
        if grams.abs() >= band_g {
            self.clear_rest();
            return (grams, false);
        }
        self.rest_sum += f64::from(filtered);
        self.rest_count += 1;
        if self.rest_count < needed {
            return (grams, false);
        }
        let zero = (self.rest_sum / f64::from(self.rest_count)) as f32;
        let before = self.model.zero_counts();
        self.model = self.model.with_zero(zero);
        self.clear_rest();
        info!(zero_counts = zero, previous = before, "auto-tare re-zeroed");
        (self.model.convert_counts(filtered), true)
    }
}

struct Shared {
    filter: Mutex<FilterPipeline>,
    calibration: Mutex<CalibrationState>,
    latest: Mutex<Option<Snapshot>>,
    latest_weight: AtomicU32,
    counters: Counters,
    thresholds: Arc<Thresholds>,
    lock_timeout: Duration,
    auto_tare_count: u32,
}

pub struct Acquisition {
    shared: Arc<Shared>,
    rx: Mutex<Option<xch::Receiver<WeightSample>>>,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl Acquisition {
    pub fn spawn<L, C>(
        cell: L,
        clock: C,
        cfg: &CoreConfig,
        model: CalibrationModel,
        thresholds: Arc<Thresholds>,
    ) -> Self
    where
        L: LoadCell + Send + 'static,
        C: Clock + Send + 'static,
    {
        let (tx, rx) = xch::bounded(cfg.acquisition.queue_capacity.max(1));
        let shared = Arc::new(Shared {
            filter: Mutex::new(cfg.filter.build()),
            calibration: Mutex::new(CalibrationState::new(model)),
            latest: Mutex::new(None),
            latest_weight: AtomicU32::new(0.0f32.to_bits()),
            counters: Counters::default(),
            thresholds,
            lock_timeout: cfg.acquisition.lock_timeout,
            auto_tare_count: cfg.auto_tare.count,
        });
        let shutdown = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let epoch = clock.now();
        let worker = Worker {
            cell,
            clock,
            epoch,
            tx,
            shared: shared.clone(),
            shutdown: shutdown.clone(),
            running: running.clone(),
            period: Duration::from_micros(crate::util::period_us(cfg.acquisition.sample_rate_hz)),
            read_timeout: cfg.acquisition.read_timeout,
            seq: 0,
            consumer_gone: false,
        };
        let join_handle = std::thread::spawn(move || worker.run());
        info!(
            hz = cfg.acquisition.sample_rate_hz,
            queue = cfg.acquisition.queue_capacity,
            mode = ?cfg.filter.mode,
            "acquisition started"
        );

        Self {
            shared,
            rx: Mutex::new(Some(rx)),
            shutdown,
            running,
            join_handle: Some(join_handle),
        }
    }

    /// Take the queue's consumer end. Only the first call gets it.
    pub fn subscribe(&self) -> Option<xch::Receiver<WeightSample>> {
        self.rx.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Most recent calibrated weight (0.0 before the first sample).
    pub fn latest_weight(&self) -> f32 {
        f32::from_bits(self.shared.latest_weight.load(Ordering::Relaxed))
    }

    pub fn latest(&self) -> Option<Snapshot> {
        *self
            .shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block (polling the snapshot) until a sample newer than `after_seq` exists.
    pub fn wait_for_sample(&self, after_seq: u64, timeout: Duration) -> Result<Snapshot, ScaleError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(s) = self.latest().filter(|s| s.seq > after_seq) {
                return Ok(s);
            }
            if !self.is_running() {
                return Err(ScaleError::State("acquisition stopped".into()));
            }
            if Instant::now() >= deadline {
                return Err(ScaleError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    pub fn calibration(&self) -> Result<CalibrationModel, ScaleError> {
        Ok(lock_with_timeout(&self.shared.calibration, self.shared.lock_timeout)?.model)
    }

    /// Install a new model and restart auto-tare accumulation.
    pub fn set_calibration(&self, model: CalibrationModel) -> Result<(), ScaleError> {
        let mut cal = lock_with_timeout(&self.shared.calibration, self.shared.lock_timeout)?;
        cal.model = model;
        cal.clear_rest();
        debug!(slope = model.slope, intercept = model.intercept, "calibration installed");
        Ok(())
    }

    pub fn thresholds(&self) -> &Arc<Thresholds> {
        &self.shared.thresholds
    }

    pub fn stats(&self) -> AcquisitionStats {
        let c = &self.shared.counters;
        AcquisitionStats {
            samples: c.samples.load(Ordering::Relaxed),
            timeouts: c.timeouts.load(Ordering::Relaxed),
            hardware_errors: c.hardware_errors.load(Ordering::Relaxed),
            lock_timeouts: c.lock_timeouts.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            auto_tares: c.auto_tares.load(Ordering::Relaxed),
            last_ok_ms: c.last_ok_ms.load(Ordering::Relaxed),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Signal the thread and wait for it. The worker finishes its current
    /// read first (bounded by the read timeout). Idempotent.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => trace!("acquisition thread joined"),
                Err(e) => warn!(?e, "acquisition thread panicked during shutdown"),
            }
        }
    }

    #[cfg(test)]
    fn hold_filter_lock(&self) -> std::sync::MutexGuard<'_, FilterPipeline> {
        self.shared
            .filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker<L, C> {
    cell: L,
    clock: C,
    epoch: Instant,
    tx: xch::Sender<WeightSample>,
    shared: Arc<Shared>,
    shutdown: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    period: Duration,
    read_timeout: Duration,
    seq: u64,
    consumer_gone: bool,
}

impl<L: LoadCell, C: Clock> Worker<L, C> {
    fn run(mut self) {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                debug!("acquisition thread received shutdown signal");
                break;
            }
            let started = self.clock.now();

            match self.cell.read_raw(self.read_timeout) {
                Ok(raw) => self.handle_raw(raw),
                Err(e) => match map_hw_error(&*e) {
                    ScaleError::Timeout => {
                        bump(&self.shared.counters.timeouts);
                        debug!("load cell not ready, skipping cycle");
                    }
                    other => {
                        bump(&self.shared.counters.hardware_errors);
                        warn!(error = %other, "load cell read failed");
                    }
                },
            }

            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            let elapsed = self.clock.now().saturating_duration_since(started);
            if let Some(rest) = self.period.checked_sub(elapsed) {
                self.clock.sleep(rest);
            }
        }
        self.running.store(false, Ordering::Relaxed);
        trace!("acquisition thread exiting cleanly");
    }

    fn handle_raw(&mut self, raw: i32) {
        let shared = &*self.shared;
        let now_ms = self.clock.ms_since(self.epoch);
        shared.counters.last_ok_ms.store(now_ms, Ordering::Relaxed);
        trace!(raw, "raw sample");

        let filtered = match lock_with_timeout(&shared.filter, shared.lock_timeout) {
            Ok(mut pipeline) => {
                pipeline.set_step_threshold(shared.thresholds.get(Threshold::Step));
                pipeline.process(raw as f32)
            }
            Err(_) => {
                bump(&shared.counters.lock_timeouts);
                warn!("filter state busy, skipping cycle");
                return;
            }
        };

        let band = shared.thresholds.get(Threshold::AutoTareBand);
        let weight_g = match lock_with_timeout(&shared.calibration, shared.lock_timeout) {
            Ok(mut cal) => {
                let (w, rezeroed) = cal.weigh(filtered, band, shared.auto_tare_count);
                if rezeroed {
                    bump(&shared.counters.auto_tares);
                }
                w
            }
            Err(_) => {
                bump(&shared.counters.lock_timeouts);
                warn!("calibration state busy, skipping cycle");
                return;
            }
        };

        self.seq += 1;
        let snapshot = Snapshot {
            seq: self.seq,
            raw,
            filtered_counts: filtered,
            weight_g,
            timestamp_ms: now_ms,
        };
        *shared.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
        shared
            .latest_weight
            .store(weight_g.to_bits(), Ordering::Relaxed);
        bump(&shared.counters.samples);

        let sample = WeightSample {
            value_g: weight_g,
            raw_counts: filtered,
            timestamp_ms: now_ms,
        };
        match self.tx.try_send(sample) {
            Ok(()) => {}
            Err(xch::TrySendError::Full(_)) => {
                bump(&shared.counters.dropped);
                trace!(seq = self.seq, error = %ScaleError::QueueFull, "sample dropped");
            }
            Err(xch::TrySendError::Disconnected(_)) => {
                bump(&shared.counters.dropped);
                if !self.consumer_gone {
                    self.consumer_gone = true;
                    debug!("sample consumer disconnected; snapshot-only mode");
                }
            }
        }
    }
}
