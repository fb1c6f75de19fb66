//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "scale", version, about = "Weighing station CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/scale_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the weighing session loop
    Run {
        /// Stop after this many ticks; unset means run until Ctrl-C
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Skip the startup tare (the persisted or compiled-in zero stays
        /// in effect)
        #[arg(long, action = ArgAction::SetTrue)]
        no_tare: bool,
    },
    /// Zero the scale once and exit
    Tare,
    /// Calibrate against a known reference weight already on the tared
    /// scale, expressed in base units
    Calibrate {
        /// Negative values parse and are rejected with a typed error
        /// instead of a usage error
        #[arg(long, value_name = "WEIGHT", allow_negative_numbers = true)]
        known: f64,
    },
    /// Quick health check (front-end presence / sim ok)
    SelfCheck,
}
