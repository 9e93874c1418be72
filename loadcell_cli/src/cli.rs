//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "loadcell", version, about = "Load-cell scale CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/loadcell.toml")]
    pub config: PathBuf,

    /// Optional multi-point calibration CSV (strict `raw,grams` header)
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Use the simulated load cell instead of GPIO
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub simulate: bool,

    /// Log and print results as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to
    /// logging.level, then info. RUST_LOG wins over both.
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Acquire continuously and print weight events until Ctrl-C
    Run {
        /// Stop after this many seconds
        #[arg(long, value_name = "SECS")]
        duration_s: Option<u64>,
        /// Print a status line with the latest weight at this interval
        #[arg(long, value_name = "MS")]
        status_ms: Option<u64>,
    },
    /// Tare, then fit a single point against a known weight
    Calibrate {
        /// Known calibration weight in grams (defaults to calibration.known_weight_g)
        #[arg(long, value_name = "GRAMS")]
        known_g: Option<f32>,
        /// Seconds to wait for the weight to be placed (overrides calibration.settle_ms)
        #[arg(long, value_name = "SECS")]
        settle_s: Option<u64>,
    },
    /// Quick health check (sensor answers, calibration input parses)
    SelfCheck,
}
