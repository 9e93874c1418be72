//! `loadcell` command-line front end.
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr, eyre};

mod backend;
mod calibrate;
mod cli;
mod error_fmt;
mod logging;
mod run;

use cli::{Cli, Commands, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    if let Err(e) = real_main() {
        tracing::debug!(error = ?e, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn load_config(path: &Path) -> Result<loadcell_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = loadcell_config::load_toml(&text)
        .map_err(|e| eyre!("invalid configuration in {}: {e}", path.display()))?;
    cfg.validate()
        .map_err(|e| eyre!("invalid configuration in {}: {e}", path.display()))?;
    Ok(cfg)
}

fn real_main() -> Result<()> {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    color_eyre::install()?;

    let cfg = load_config(&cli.config)?;
    logging::init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    match &cli.cmd {
        Commands::Run {
            duration_s,
            status_ms,
        } => run::run(&cli, &cfg, *duration_s, *status_ms, &shutdown),
        Commands::Calibrate { known_g, settle_s } => {
            calibrate::calibrate(&cli, &cfg, *known_g, *settle_s)
        }
        Commands::SelfCheck => calibrate::self_check(&cli, &cfg),
    }
}
