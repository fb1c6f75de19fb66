#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and calibration persistence for the weighing station.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `CalibrationFile` persists the zero offset / scale factor pair as a
//!   small TOML document; a missing file is not an error.

use serde::{Deserialize, Serialize};

use scale_traits::{CalibrationStore, StoredCalibration};

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FrontEndKind {
    /// Bit-banged 24-bit bridge ADC (raw counts).
    Bitbang,
    /// I2C averaging front-end (milli-units as counts).
    Averaging,
    /// Scripted hostside front-end.
    #[default]
    Simulated,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FrontEndCfg {
    pub kind: FrontEndKind,
}

impl Default for FrontEndCfg {
    fn default() -> Self {
        Self {
            kind: FrontEndKind::Simulated,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    /// ADC data-out / data-ready line.
    pub adc_dout: u8,
    /// ADC serial clock line.
    pub adc_sclk: u8,
    /// I2C address of the averaging front-end.
    pub i2c_addr: u16,
}

impl Default for Pins {
    fn default() -> Self {
        // Wiring of the reference station.
        Self {
            adc_dout: 34,
            adc_sclk: 4,
            i2c_addr: 0x2A,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct StabilityCfg {
    /// Ring capacity of the rolling weight buffer.
    pub capacity: usize,
    /// Population stddev below which the stream counts as settling.
    pub stable_stddev: f64,
}

impl Default for StabilityCfg {
    fn default() -> Self {
        Self {
            capacity: 12,
            stable_stddev: 0.03,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SessionCfg {
    /// Minimum |weight| considered "something is on the scale".
    pub presence_threshold: f64,
    /// |weight| range considered "nothing is on the scale".
    pub zero_band: f64,
    /// Stddev must hold below threshold this long before capture.
    pub stable_min_ms: u64,
    /// Force-capture fallback when the stream never settles.
    pub weighing_timeout_ms: u64,
    /// Abandoned-session timeout: no tag and weight in the zero band.
    pub no_id_zero_timeout_ms: u64,
    /// Displayed magnitudes below this clamp to exactly zero.
    pub display_zero_clamp: f64,
    /// Controller tick cadence.
    pub tick_ms: u64,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            presence_threshold: 0.05,
            zero_band: 0.03,
            stable_min_ms: 1500,
            weighing_timeout_ms: 15_000,
            no_id_zero_timeout_ms: 10_000,
            display_zero_clamp: 0.002,
            tick_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TareCfg {
    /// Raw readings averaged into the zero offset.
    pub samples: u32,
    /// Overall read attempts before a tare gives up collecting.
    pub attempt_budget: u32,
    /// Post-tare verification: |weight| must fall inside this tolerance.
    pub zero_tolerance: f64,
    /// Full tare retries when verification fails.
    pub max_attempts: u32,
    /// Negative readings beyond this band trigger the one-shot
    /// orientation sign flip.
    pub orientation_noise_band: f64,
}

impl Default for TareCfg {
    fn default() -> Self {
        Self {
            samples: 16,
            attempt_budget: 64,
            zero_tolerance: 0.05,
            max_attempts: 3,
            orientation_noise_band: 0.05,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Timeouts {
    /// Max wait for the converter's data-ready signal per read (ms).
    pub sensor_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { sensor_ms: 500 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
#[serde(default)]
pub struct PersistedCalibration {
    /// Tare baseline in raw counts.
    pub zero_counts: i64,
    /// Physical units per count.
    pub scale_factor: f64,
    /// Display divisor (e.g. 1000.0 shows kg when the factor yields grams).
    pub unit_divisor: f64,
}

impl Default for PersistedCalibration {
    fn default() -> Self {
        Self {
            zero_counts: 0,
            scale_factor: 1.0,
            unit_divisor: 1000.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub frontend: FrontEndCfg,
    pub pins: Pins,
    pub stability: StabilityCfg,
    pub session: SessionCfg,
    pub tare: TareCfg,
    pub timeouts: Timeouts,
    pub logging: Logging,
    /// Compiled-in calibration defaults; a populated store takes
    /// precedence at runtime.
    pub calibration: PersistedCalibration,
    /// Path of the calibration store file; absent means no persistence.
    pub calibration_file: Option<String>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Stability
        if self.stability.capacity < 2 {
            eyre::bail!("stability.capacity must be >= 2");
        }
        if self.stability.capacity > 1024 {
            eyre::bail!("stability.capacity is unreasonably large (>1024)");
        }
        if !(self.stability.stable_stddev > 0.0) {
            eyre::bail!("stability.stable_stddev must be > 0");
        }

        // Session
        if !(self.session.presence_threshold > 0.0) {
            eyre::bail!("session.presence_threshold must be > 0");
        }
        if !(self.session.zero_band > 0.0) {
            eyre::bail!("session.zero_band must be > 0");
        }
        if self.session.zero_band > self.session.presence_threshold {
            eyre::bail!("session.zero_band must not exceed session.presence_threshold");
        }
        if self.session.tick_ms == 0 {
            eyre::bail!("session.tick_ms must be >= 1");
        }
        if self.session.weighing_timeout_ms <= self.session.stable_min_ms {
            eyre::bail!("session.weighing_timeout_ms must exceed session.stable_min_ms");
        }
        if self.session.display_zero_clamp.is_sign_negative() {
            eyre::bail!("session.display_zero_clamp must be >= 0");
        }

        // Tare
        if self.tare.samples == 0 {
            eyre::bail!("tare.samples must be >= 1");
        }
        if self.tare.attempt_budget < self.tare.samples {
            eyre::bail!("tare.attempt_budget must be >= tare.samples");
        }
        if self.tare.max_attempts == 0 {
            eyre::bail!("tare.max_attempts must be >= 1");
        }
        if !(self.tare.zero_tolerance > 0.0) {
            eyre::bail!("tare.zero_tolerance must be > 0");
        }

        // Timeouts
        if self.timeouts.sensor_ms == 0 {
            eyre::bail!("timeouts.sensor_ms must be >= 1");
        }

        // Calibration
        if self.calibration.scale_factor == 0.0 || !self.calibration.scale_factor.is_finite() {
            eyre::bail!("calibration.scale_factor must be finite and nonzero");
        }
        if self.calibration.unit_divisor == 0.0 || !self.calibration.unit_divisor.is_finite() {
            eyre::bail!("calibration.unit_divisor must be finite and nonzero");
        }

        Ok(())
    }
}

/// TOML-file-backed calibration store.
pub struct CalibrationFile {
    path: std::path::PathBuf,
}

#[derive(Debug, Deserialize, Serialize)]
struct StoreDoc {
    zero_counts: i64,
    scale_factor: f64,
}

impl CalibrationFile {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CalibrationStore for CalibrationFile {
    fn load(
        &mut self,
    ) -> Result<Option<StoredCalibration>, Box<dyn std::error::Error + Send + Sync>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)?;
        let doc: StoreDoc = toml::from_str(&text)?;
        Ok(Some(StoredCalibration {
            zero_counts: doc.zero_counts,
            scale_factor: doc.scale_factor,
        }))
    }

    fn save(
        &mut self,
        cal: StoredCalibration,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let doc = StoreDoc {
            zero_counts: cal.zero_counts,
            scale_factor: cal.scale_factor,
        };
        let text = toml::to_string_pretty(&doc)?;
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}
