//! `run`: continuous acquisition, event printing and shutdown summary.
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use eyre::{Result, eyre};
use loadcell_core::{CalibrationModel, CoreConfig, ScaleError, ScaleService, WeightEvent};
use loadcell_traits::MonotonicClock;
use serde_json::json;
use tracing::info;

use crate::backend::{self, Backend, SIM_COUNTS_PER_GRAM};

/// Pick the raw→grams model: CSV table, else a nominal scale factor
/// (configured, or the simulator's) with a fresh startup tare.
pub fn resolve_model(
    csv: Option<&Path>,
    cfg: &loadcell_config::Config,
    core: &CoreConfig,
    backend: &mut Backend,
) -> Result<CalibrationModel> {
    if let Some(path) = csv {
        let rows = loadcell_config::load_calibration_csv(path)?;
        let model = CalibrationModel::try_from(rows.as_slice())?;
        info!(
            rows = rows.len(),
            slope = model.slope,
            intercept = model.intercept,
            "calibration table loaded"
        );
        return Ok(model);
    }
    let g_per_count = cfg
        .calibration
        .g_per_count
        .or_else(|| backend.is_simulated().then_some(1.0 / SIM_COUNTS_PER_GRAM))
        .ok_or_else(|| {
            eyre!(
                "no calibration available: pass --calibration <csv> or set calibration.g_per_count (see `calibrate`)"
            )
        })?;
    let zero = loadcell_core::tare_load_cell(
        backend.cell.as_mut(),
        &MonotonicClock::new(),
        &core.calibration,
        core.acquisition.read_timeout,
    )?;
    info!(zero, g_per_count, "startup tare complete");
    Ok(CalibrationModel::from_zero(g_per_count, zero as f32)?)
}

fn print_event(ev: &WeightEvent, json_out: bool) {
    if json_out {
        println!(
            "{}",
            json!({
                "event": ev.kind.label(),
                "weight_g": ev.weight_g,
                "timestamp_ms": ev.timestamp_ms,
                "time": ev.wall_time.to_rfc3339(),
            })
        );
    } else {
        println!("{}", ev.log_row());
    }
}

pub fn run(
    cli: &crate::cli::Cli,
    cfg: &loadcell_config::Config,
    duration_s: Option<u64>,
    status_ms: Option<u64>,
    shutdown: &Arc<AtomicBool>,
) -> Result<()> {
    let core = CoreConfig::from(cfg);
    let mut backend = backend::open(cfg, cli.simulate)?;
    let model = resolve_model(cli.calibration.as_deref(), cfg, &core, &mut backend)?;
    let sim_load = backend.sim_load.clone();
    let svc = ScaleService::start(backend.cell, MonotonicClock::new(), &core, model)?;
    let events = svc.subscribe_events();

    let mut script = sim_load.zip(backend::sim_script());
    if let Some((load, (grams, _))) = &script {
        info!(grams, "placing simulated load");
        load.set_grams(*grams);
    }

    let started = Instant::now();
    let deadline = duration_s.map(|s| started + Duration::from_secs(s));
    let status_every = status_ms.map(Duration::from_millis);
    let mut last_status = started;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("shutdown requested");
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        match events.recv_timeout(Duration::from_millis(50)) {
            Ok(ev) => print_event(&ev, cli.json),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ScaleError::State("event stream closed".into()).into());
            }
        }
        if let Some(every) = status_every
            && last_status.elapsed() >= every
        {
            last_status = Instant::now();
            let w = svc.get_latest_weight();
            if cli.json {
                println!("{}", json!({ "weight_g": w, "manager": format!("{:?}", svc.status().manager) }));
            } else {
                println!("{w:.2} g");
            }
        }
        if let Some((load, (_, Some(hold)))) = &script
            && started.elapsed() >= *hold
        {
            info!("lifting simulated load");
            load.set_grams(0.0);
            script = None;
        }
    }

    let stats = svc.stats();
    let status = svc.shutdown();
    if cli.json {
        println!(
            "{}",
            json!({
                "summary": {
                    "processed": status.processed,
                    "samples": stats.samples,
                    "dropped": stats.dropped,
                    "timeouts": stats.timeouts,
                    "hardware_errors": stats.hardware_errors,
                    "auto_tares": stats.auto_tares,
                    "last_weight_g": status.last_weight_g,
                }
            })
        );
    } else {
        println!(
            "Stopped: {} samples processed ({} dropped, {} timeouts), last weight {:.2} g",
            status.processed, stats.dropped, stats.timeouts, status.last_weight_g
        );
    }
    Ok(())
}
