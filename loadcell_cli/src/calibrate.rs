//! `calibrate` and `self-check`: direct load-cell access, no acquisition task.
use std::io::Write;
use std::time::Duration;

use eyre::{Result, bail};
use loadcell_core::hw_error::map_hw_error;
use loadcell_core::{CalibrationModel, CalibrationStep, CoreConfig};
use loadcell_traits::MonotonicClock;
use serde_json::json;

use crate::backend;
use crate::cli::Cli;

fn say(json_out: bool, msg: &str) {
    if !json_out {
        println!("{msg}");
        let _ = std::io::stdout().flush();
    }
}

pub fn calibrate(
    cli: &Cli,
    cfg: &loadcell_config::Config,
    known_g: Option<f32>,
    settle_s: Option<u64>,
) -> Result<()> {
    let mut core = CoreConfig::from(cfg);
    if let Some(s) = settle_s {
        core.calibration.settle = Duration::from_secs(s);
    }
    let known = known_g.unwrap_or(core.calibration.known_weight_g);
    if !(known.is_finite() && known > 0.0) {
        bail!("calibration weight must be positive, got {known}");
    }
    let mut backend = backend::open(cfg, cli.simulate)?;
    let sim_load = backend.sim_load.clone();
    let settle = core.calibration.settle;

    let model = loadcell_core::calibrate_load_cell(
        backend.cell.as_mut(),
        &MonotonicClock::new(),
        &core.calibration,
        core.acquisition.read_timeout,
        known,
        |step| match step {
            CalibrationStep::ClearScale => {
                say(cli.json, "Remove everything from the scale. Taring...");
            }
            CalibrationStep::PlaceWeight { known_weight_g } => {
                if let Some(load) = &sim_load {
                    load.set_grams(known_weight_g);
                }
                say(
                    cli.json,
                    &format!(
                        "Place {known_weight_g:.1} g on the scale ({}s)...",
                        settle.as_secs()
                    ),
                );
            }
            CalibrationStep::Measuring => say(cli.json, "Measuring..."),
            CalibrationStep::Done(_) => {}
        },
    )?;
    report(&model, known, cli.json);
    Ok(())
}

fn report(model: &CalibrationModel, known_g: f32, json_out: bool) {
    if json_out {
        println!(
            "{}",
            json!({
                "slope": model.slope,
                "intercept": model.intercept,
                "zero_counts": model.zero_counts(),
                "known_g": known_g,
            })
        );
        return;
    }
    println!(
        "Calibration complete: {:.6e} g/count, zero at {:.0} counts",
        model.slope,
        model.zero_counts()
    );
    println!("Add to the config to skip calibration next time:");
    println!("[calibration]\ng_per_count = {}", model.slope);
}

/// Sensor answers within the read timeout and calibration input parses.
pub fn self_check(cli: &Cli, cfg: &loadcell_config::Config) -> Result<()> {
    if let Some(path) = cli.calibration.as_deref() {
        let rows = loadcell_config::load_calibration_csv(path)?;
        CalibrationModel::try_from(rows.as_slice())?;
    }
    let core = CoreConfig::from(cfg);
    let mut backend = backend::open(cfg, cli.simulate)?;
    let mut raws = Vec::with_capacity(3);
    for _ in 0..3 {
        let raw = backend
            .cell
            .read_raw(core.acquisition.read_timeout)
            .map_err(|e| map_hw_error(&*e))?;
        raws.push(raw);
    }
    if cli.json {
        println!("{}", json!({ "ok": true, "raw": raws }));
    } else {
        println!("OK: sensor responding, raw {raws:?}");
    }
    Ok(())
}
