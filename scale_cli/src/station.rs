//! Front-end selection and station assembly.

use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, WrapErr};

use scale_config::{CalibrationFile, Config, FrontEndKind};
use scale_core::{Calibration, Scale, SessionCfg, Station, StationHandle, UploadDispatcher};
use scale_hardware::{ConsoleDisplay, ScriptedTagReader, SimulatedFrontEnd, StdoutUploader};
use scale_traits::{FrontEnd, MonotonicClock};

pub type BoxedFrontEnd = Box<dyn FrontEnd + Send>;

pub fn build_front_end(cfg: &Config) -> Result<BoxedFrontEnd> {
    match cfg.frontend.kind {
        FrontEndKind::Simulated => Ok(Box::new(sim_front_end())),
        FrontEndKind::Bitbang => open_bitbang(cfg),
        FrontEndKind::Averaging => open_averaging(cfg),
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_bitbang(cfg: &Config) -> Result<BoxedFrontEnd> {
    let fe = scale_hardware::ads1232::Ads1232::open(cfg.pins.adc_dout, cfg.pins.adc_sclk)
        .wrap_err("opening bit-banged ADC")?;
    Ok(Box::new(fe))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_averaging(cfg: &Config) -> Result<BoxedFrontEnd> {
    let hw_cfg = scale_hardware::nau7802::Nau7802Cfg {
        addr: cfg.pins.i2c_addr,
        ..Default::default()
    };
    let fe = scale_hardware::nau7802::Nau7802::open(hw_cfg)
        .wrap_err("opening averaging front-end")?;
    Ok(Box::new(fe))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_bitbang(_cfg: &Config) -> Result<BoxedFrontEnd> {
    eyre::bail!("frontend.kind = \"bitbang\" requires a Linux build with the `hardware` feature")
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_averaging(_cfg: &Config) -> Result<BoxedFrontEnd> {
    eyre::bail!("frontend.kind = \"averaging\" requires a Linux build with the `hardware` feature")
}

/// Simulated sample stream. `SCALE_SIM_SCRIPT` overrides the default demo
/// run: comma-separated raw counts, `_` for a data-ready gap.
fn sim_front_end() -> SimulatedFrontEnd {
    if let Ok(script) = std::env::var("SCALE_SIM_SCRIPT") {
        let seq: Vec<Option<i32>> = script
            .split(',')
            .map(|tok| {
                let tok = tok.trim();
                if tok == "_" { None } else { tok.parse().ok() }
            })
            .collect();
        return SimulatedFrontEnd::with_gaps(seq);
    }
    // Demo: empty scale through the startup tare, a 5.0 plateau, removal.
    let mut seq = vec![0; 32];
    seq.extend(std::iter::repeat_n(5_000, 40));
    seq.extend([0; 20]);
    SimulatedFrontEnd::new(seq)
}

/// Scripted tag stream for the simulated reader; `SCALE_SIM_TAGS` is a
/// comma-separated list, each entry observed once.
fn sim_tag_reader() -> ScriptedTagReader {
    let tags = std::env::var("SCALE_SIM_TAGS").unwrap_or_else(|_| "SIM01".into());
    let seq: Vec<Option<String>> = std::iter::once(None)
        .chain(tags.split(',').map(|t| Some(t.trim().to_string())))
        .collect();
    ScriptedTagReader::new(seq)
}

/// Build a `Scale` from the config: front-end, compiled-in calibration,
/// and the persistence store when one is configured.
pub fn build_scale(cfg: &Config) -> Result<Scale<BoxedFrontEnd>> {
    let front_end = build_front_end(cfg)?;
    let calibration =
        Calibration::try_from(&cfg.calibration).wrap_err("invalid compiled-in calibration")?;
    let mut scale = Scale::new(
        front_end,
        calibration,
        (&cfg.tare).into(),
        Duration::from_millis(cfg.timeouts.sensor_ms),
    );
    if let Some(path) = &cfg.calibration_file {
        scale
            .attach_store(Box::new(CalibrationFile::new(path)))
            .wrap_err("attaching calibration store")?;
    }
    Ok(scale)
}

pub fn build_station(cfg: &Config) -> Result<(Station<BoxedFrontEnd>, StationHandle)> {
    let scale = build_scale(cfg)?;
    let (station, handle) = Station::new(
        scale,
        cfg.stability.capacity,
        SessionCfg::from(cfg),
        Box::new(ConsoleDisplay),
        Box::new(sim_tag_reader()),
        UploadDispatcher::spawn(StdoutUploader),
        Arc::new(MonotonicClock::new()),
        Duration::from_millis(cfg.session.tick_ms),
    );
    Ok((station, handle))
}
