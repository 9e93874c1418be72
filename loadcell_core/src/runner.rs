//! Running scale: acquisition task plus the consumer that drives the
//! weight manager and detector and republishes their events.
//!
//! Teardown order: stop acquisition (which closes the queue), let the
//! consumer drain and exit, then release shared state.
use std::cell::Cell;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as xch;
use loadcell_traits::{Clock, LoadCell};
use tracing::{debug, info, trace, warn};

use crate::acquisition::{Acquisition, AcquisitionStats};
use crate::calibration::{CalibrationModel, CalibrationStep, run_procedure};
use crate::config::{CalibrationCfg, CoreConfig};
use crate::detection::{DetectionEvent, DetectionState, WeightDetector};
use crate::error::{CalibrationError, Result, ScaleError};
use crate::events::{EventBus, EventKind, WeightEvent};
use crate::manager::{ManagerOutput, ManagerState, WeightManager};
use crate::thresholds::{Threshold, Thresholds};
use crate::types::{Snapshot, WeightSample};

/// What the consumer last saw.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConsumerStatus {
    pub manager: ManagerState,
    pub detection: DetectionState,
    pub last_weight_g: f32,
    pub last_timestamp_ms: u64,
    pub processed: u64,
    /// Rate-limited status emissions while active.
    pub status_updates: u64,
}

pub struct ScaleService<C> {
    acquisition: Acquisition,
    events: Arc<EventBus>,
    status: Arc<Mutex<ConsumerStatus>>,
    consumer: Option<JoinHandle<()>>,
    clock: C,
    calibration_cfg: CalibrationCfg,
    sample_wait: Duration,
}

impl<C: Clock + Clone + Send + 'static> ScaleService<C> {
    pub fn start<L>(cell: L, clock: C, cfg: &CoreConfig, model: CalibrationModel) -> Result<Self>
    where
        L: LoadCell + Send + 'static,
    {
        let thresholds = Arc::new(Thresholds::from_config(cfg));
        let acquisition = Acquisition::spawn(cell, clock.clone(), cfg, model, thresholds.clone());
        let rx = acquisition
            .subscribe()
            .ok_or_else(|| eyre::eyre!("sample queue already has a consumer"))?;
        let events = Arc::new(EventBus::default());
        let status = Arc::new(Mutex::new(ConsumerStatus::default()));
        let consumer = Consumer {
            rx,
            manager: WeightManager::new(cfg.manager),
            detector: WeightDetector::new(cfg.detection),
            thresholds,
            events: events.clone(),
            status: status.clone(),
            local: ConsumerStatus::default(),
        };
        let handle = std::thread::spawn(move || consumer.run());

        let period = Duration::from_micros(crate::util::period_us(cfg.acquisition.sample_rate_hz));
        Ok(Self {
            acquisition,
            events,
            status,
            consumer: Some(handle),
            clock,
            calibration_cfg: cfg.calibration.clone(),
            sample_wait: cfg.acquisition.read_timeout * 2 + period * 4,
        })
    }

    /// Non-blocking: most recent calibrated, filtered weight.
    pub fn get_latest_weight(&self) -> f32 {
        self.acquisition.latest_weight()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.acquisition.latest()
    }

    pub fn subscribe_events(&self) -> xch::Receiver<WeightEvent> {
        self.events.subscribe()
    }

    pub fn set_threshold(&self, name: &str, value: f32) -> std::result::Result<(), ScaleError> {
        self.acquisition.thresholds().set_by_name(name, value)
    }

    pub fn get_threshold(&self, name: &str) -> std::result::Result<f32, ScaleError> {
        self.acquisition.thresholds().get_by_name(name)
    }

    pub fn threshold(&self, t: Threshold) -> f32 {
        self.acquisition.thresholds().get(t)
    }

    pub fn calibration(&self) -> std::result::Result<CalibrationModel, ScaleError> {
        self.acquisition.calibration()
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.acquisition.stats()
    }

    pub fn status(&self) -> ConsumerStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Tare and single-point fit from fresh raw samples, then install the
    /// model. Blocks for the configured settle time.
    pub fn calibrate(
        &self,
        known_weight_g: f32,
        mut prompt: impl FnMut(CalibrationStep),
    ) -> std::result::Result<CalibrationModel, CalibrationError> {
        let acq = &self.acquisition;
        // Samples read before the operator acted must not be used: on each
        // phase change skip the first sample published after the prompt.
        let resync = Cell::new(true);
        let seen = Cell::new(acq.latest().map_or(0, |s| s.seq));
        let read = || -> std::result::Result<i32, ScaleError> {
            if resync.replace(false) {
                let now = acq.latest().map_or(0, |s| s.seq).max(seen.get());
                seen.set(acq.wait_for_sample(now, self.sample_wait)?.seq);
            }
            let s = acq.wait_for_sample(seen.get(), self.sample_wait)?;
            seen.set(s.seq);
            Ok(s.raw)
        };
        let model = run_procedure(
            read,
            &self.clock,
            &self.calibration_cfg,
            known_weight_g,
            |step| {
                if matches!(step, CalibrationStep::ClearScale | CalibrationStep::Measuring) {
                    resync.set(true);
                }
                prompt(step);
            },
        )?;
        acq.set_calibration(model)
            .map_err(|e| CalibrationError::Acquisition(e.to_string()))?;
        Ok(model)
    }

    /// Stop acquisition, drain the consumer and return its final status.
    pub fn shutdown(mut self) -> ConsumerStatus {
        self.stop();
        self.status()
    }

    fn stop(&mut self) {
        self.acquisition.stop();
        if let Some(handle) = self.consumer.take() {
            if let Err(e) = handle.join() {
                warn!(?e, "consumer thread panicked during shutdown");
            }
        }
        debug!(stats = ?self.acquisition.stats(), "scale service stopped");
    }
}

impl<C> Drop for ScaleService<C> {
    fn drop(&mut self) {
        self.acquisition.stop();
        if let Some(handle) = self.consumer.take() {
            let _ = handle.join();
        }
    }
}

struct Consumer {
    rx: xch::Receiver<WeightSample>,
    manager: WeightManager,
    detector: WeightDetector,
    thresholds: Arc<Thresholds>,
    events: Arc<EventBus>,
    status: Arc<Mutex<ConsumerStatus>>,
    local: ConsumerStatus,
}

impl Consumer {
    fn run(mut self) {
        while let Ok(sample) = self.rx.recv() {
            self.handle(sample);
        }
        trace!(processed = self.local.processed, "consumer drained, exiting");
    }

    fn emit(&self, kind: EventKind, weight_g: f32, timestamp_ms: u64) {
        let event = WeightEvent::new(kind, weight_g, timestamp_ms);
        info!(target: "loadcell::events", "{}", event.log_row());
        self.events.publish(&event);
    }

    fn handle(&mut self, sample: WeightSample) {
        let th = &self.thresholds;
        self.manager.set_wake_threshold(th.get(Threshold::Wake));
        self.manager.set_sleep_threshold(th.get(Threshold::Sleep));
        self.detector.set_presence_threshold(th.get(Threshold::Presence));
        self.detector.set_change_threshold_pct(th.get(Threshold::ChangePct));

        let (w, ts) = (sample.value_g, sample.timestamp_ms);
        match self.manager.process(w, ts) {
            Some(ManagerOutput::Wake { weight_g }) => self.emit(EventKind::Added, weight_g, ts),
            Some(ManagerOutput::Sleep { weight_g, .. }) => {
                self.emit(EventKind::Removed, weight_g, ts);
            }
            Some(ManagerOutput::Status { weight_g }) => {
                self.local.status_updates += 1;
                self.emit(EventKind::Status, weight_g, ts);
            }
            None => {}
        }
        match self.detector.process(w, ts) {
            Some(DetectionEvent::Stable { weight_g }) => self.emit(EventKind::Stable, weight_g, ts),
            Some(DetectionEvent::Removed { last_weight_g }) => {
                debug!(last_weight_g, "detector confirmed removal");
            }
            None => {}
        }

        self.local.manager = self.manager.state();
        self.local.detection = self.detector.state();
        self.local.last_weight_g = w;
        self.local.last_timestamp_ms = ts;
        self.local.processed += 1;
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = self.local;
    }
}
