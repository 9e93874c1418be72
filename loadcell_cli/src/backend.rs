//! Load-cell backend selection: the GPIO HX711 or the simulated cell.
use std::time::Duration;

use eyre::Result;
use loadcell_core::mocks::NeverReady;
use loadcell_hardware::{SimulatedLoad, SimulatedScale};
use loadcell_traits::LoadCell;

/// Zero offset of the simulated cell, in counts.
pub const SIM_ZERO_COUNTS: i32 = 8_000;
pub const SIM_COUNTS_PER_GRAM: f32 = 420.0;
const SIM_NOISE_COUNTS: u32 = 30;

/// Grams placed on the simulated cell once acquisition is running.
pub const ENV_SIM_LOAD: &str = "LOADCELL_SIM_LOAD_G";
/// Milliseconds after which the simulated load is lifted again.
pub const ENV_SIM_HOLD: &str = "LOADCELL_SIM_HOLD_MS";
/// Simulated cell never signals data-ready.
pub const ENV_SIM_NOT_READY: &str = "LOADCELL_SIM_NOT_READY";

pub struct Backend {
    pub cell: Box<dyn LoadCell + Send>,
    /// Handle on the simulated load, `None` for real hardware.
    pub sim_load: Option<SimulatedLoad>,
}

impl Backend {
    pub fn is_simulated(&self) -> bool {
        self.sim_load.is_some()
    }
}

pub fn open(cfg: &loadcell_config::Config, simulate: bool) -> Result<Backend> {
    if simulate {
        return Ok(simulated());
    }
    open_hardware(cfg)
}

fn simulated() -> Backend {
    let sim = SimulatedScale::new(SIM_ZERO_COUNTS, SIM_COUNTS_PER_GRAM).with_noise(SIM_NOISE_COUNTS);
    let load = sim.load();
    let cell: Box<dyn LoadCell + Send> = if std::env::var_os(ENV_SIM_NOT_READY).is_some() {
        Box::new(NeverReady)
    } else {
        Box::new(sim)
    };
    tracing::info!(
        zero = SIM_ZERO_COUNTS,
        counts_per_gram = SIM_COUNTS_PER_GRAM,
        "using simulated load cell"
    );
    Backend {
        cell,
        sim_load: Some(load),
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_hardware(cfg: &loadcell_config::Config) -> Result<Backend> {
    use eyre::WrapErr;
    use loadcell_hardware::{Gain, open_hx711, util::polls_for};

    let gain = Gain::try_from(cfg.pins.gain)?;
    let poll = Duration::from_micros(cfg.acquisition.poll_interval_us);
    let max_polls = polls_for(Duration::from_millis(cfg.acquisition.read_timeout_ms), poll);
    let hx = open_hx711(cfg.pins.hx711_dt, cfg.pins.hx711_sck, gain)
        .wrap_err("open hx711")?
        .with_polling(max_polls, poll);
    Ok(Backend {
        cell: Box::new(hx),
        sim_load: None,
    })
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_hardware(_cfg: &loadcell_config::Config) -> Result<Backend> {
    tracing::info!("built without GPIO support");
    Ok(simulated())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// Scripted load for simulated runs: grams to place and how long to hold them.
pub fn sim_script() -> Option<(f32, Option<Duration>)> {
    let grams = env_parse::<f32>(ENV_SIM_LOAD)?;
    Some((grams, env_parse::<u64>(ENV_SIM_HOLD).map(Duration::from_millis)))
}
