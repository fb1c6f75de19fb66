//! Weighing station CLI: run the session loop, tare, calibrate, or
//! self-check, against real hardware or the simulated front-end.

mod cli;
mod error_fmt;
mod station;

use std::io::BufRead;
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use scale_core::{Command, StationHandle};

fn main() {
    let code = match run() {
        Ok(()) => 0,
        Err(e) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", error_fmt::format_error_json(&e));
            } else {
                eprintln!("Error: {}", error_fmt::humanize(&e));
            }
            error_fmt::exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let cfg = load_config(&cli)?;
    init_logging(&cli, &cfg.logging)?;

    match cli.cmd {
        Commands::Run { ticks, no_tare } => cmd_run(&cfg, ticks, no_tare),
        Commands::Tare => cmd_tare(&cfg, cli.json),
        Commands::Calibrate { known } => cmd_calibrate(&cfg, known, cli.json),
        Commands::SelfCheck => cmd_self_check(&cfg, cli.json),
    }
}

/// A missing config file is not fatal: the compiled-in defaults describe a
/// fully simulated station.
fn load_config(cli: &Cli) -> Result<scale_config::Config> {
    let cfg = if cli.config.exists() {
        let text = std::fs::read_to_string(&cli.config)
            .wrap_err_with(|| format!("reading config {}", cli.config.display()))?;
        scale_config::load_toml(&text)
            .wrap_err_with(|| format!("parsing config {}", cli.config.display()))?
    } else {
        scale_config::Config::default()
    };
    cfg.validate().wrap_err("validating config")?;
    Ok(cfg)
}

fn init_logging(cli: &Cli, log_cfg: &scale_config::Logging) -> Result<()> {
    let level = log_cfg.level.as_deref().unwrap_or(&cli.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Optional JSON-lines file sink alongside the console.
    let file_layer = match &log_cfg.file {
        Some(path) => {
            let p = std::path::Path::new(path);
            let dir = match p.parent() {
                Some(d) if !d.as_os_str().is_empty() => d,
                _ => std::path::Path::new("."),
            };
            let name = p
                .file_name()
                .map(std::ffi::OsStr::to_os_string)
                .unwrap_or_else(|| "scale.log".into());
            let (writer, guard) = tracing_appender::non_blocking(
                tracing_appender::rolling::never(dir, name),
            );
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if cli.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn cmd_run(cfg: &scale_config::Config, ticks: Option<u64>, no_tare: bool) -> Result<()> {
    let (mut station, handle) = station::build_station(cfg)?;

    let ctrlc_handle = handle.clone();
    ctrlc::set_handler(move || {
        ctrlc_handle.send(Command::Shutdown);
    })
    .wrap_err("installing Ctrl-C handler")?;
    spawn_console_commands(handle);

    if no_tare {
        info!("startup tare skipped");
    } else {
        station.startup()?;
    }
    station.run(ticks)
}

/// Console control while the loop runs: `tare` re-zeroes, `quit` stops.
fn spawn_console_commands(handle: StationHandle) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match line.trim().to_ascii_lowercase().as_str() {
                "tare" | "t" => handle.send(Command::Retare),
                "quit" | "q" => {
                    handle.send(Command::Shutdown);
                    break;
                }
                "" => {}
                other => warn!(cmd = other, "unknown console command"),
            }
        }
    });
}

fn cmd_tare(cfg: &scale_config::Config, json: bool) -> Result<()> {
    let mut scale = station::build_scale(cfg)?;
    scale.tare()?;
    let zero = scale.calibration().zero_counts();
    if json {
        println!("{}", serde_json::json!({ "event": "tare", "zero_counts": zero }));
    } else {
        println!("Tare complete. zero_counts={zero}");
    }
    Ok(())
}

fn cmd_calibrate(cfg: &scale_config::Config, known: f64, json: bool) -> Result<()> {
    if known <= 0.0 || !known.is_finite() {
        return Err(eyre::Report::new(scale_core::ScaleError::InvalidKnownWeight(known)));
    }
    let mut scale = station::build_scale(cfg)?;
    scale.tare()?;
    println!("Place the {known} reference weight on the scale...");
    std::thread::sleep(Duration::from_secs(2));
    let factor = scale.calibrate(known)?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "event": "calibrate", "known": known, "scale_factor": factor })
        );
    } else {
        println!("Calibration finished. scale_factor={factor}");
    }
    Ok(())
}

fn cmd_self_check(cfg: &scale_config::Config, json: bool) -> Result<()> {
    use scale_traits::FrontEnd;

    let mut fe = station::build_front_end(cfg)?;
    let raw = fe
        .read_raw(Duration::from_millis(cfg.timeouts.sensor_ms))
        .map_err(|e| eyre::eyre!("front-end self-check read failed: {e}"))?;
    if json {
        println!("{}", serde_json::json!({ "event": "self_check", "ok": true, "raw": raw }));
    } else {
        println!("self-check ok, raw={raw}");
    }
    Ok(())
}
