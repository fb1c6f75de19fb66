//! Acquisition + calibration layer over a `FrontEnd`.
//!
//! `Scale` owns the front-end and the live `Calibration`, and carries the
//! tare procedure, the post-tare zero verification, calibration against a
//! known weight, and the one-shot orientation correction. Every mutation
//! of the calibration pair is persisted through the attached store.

use std::time::Duration;

use eyre::WrapErr;
use tracing::{info, warn};

use crate::calibration::Calibration;
use crate::error::{Result, ScaleError, map_hw_error};
use scale_traits::{CalibrationStore, FrontEnd, NullStore};

/// Readings averaged during post-tare zero verification.
const VERIFY_SAMPLES: u32 = 8;

#[derive(Debug, Clone, Copy)]
pub struct TareCfg {
    /// Raw readings averaged into the zero offset.
    pub samples: u32,
    /// Overall read attempts before sample collection gives up; individual
    /// timeouts are skipped without counting as failures.
    pub attempt_budget: u32,
    /// Post-tare verification tolerance around zero.
    pub zero_tolerance: f64,
    /// Full tare retries when verification fails.
    pub max_attempts: u32,
    /// Negative readings beyond this band trigger the orientation flip.
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

pub struct Scale<F: FrontEnd> {
    front_end: F,
    calibration: Calibration,
    store: Box<dyn CalibrationStore + Send>,
    tare_cfg: TareCfg,
    sensor_timeout: Duration,
    /// Latched after the first sign flip; at most one correction per boot
    /// so noise cannot oscillate the factor sign.
    sign_corrected: bool,
}

impl<F: FrontEnd> Scale<F> {
    pub fn new(
        front_end: F,
        calibration: Calibration,
        tare_cfg: TareCfg,
        sensor_timeout: Duration,
    ) -> Self {
        Self {
            front_end,
            calibration,
            store: Box::new(NullStore),
            tare_cfg,
            sensor_timeout,
            sign_corrected: false,
        }
    }

    /// Attach a persistence store and apply any stored pair. A missing
    /// stored value keeps the compiled-in defaults.
    pub fn attach_store(&mut self, mut store: Box<dyn CalibrationStore + Send>) -> Result<()> {
        match store.load() {
            Ok(Some(stored)) => {
                self.calibration
                    .apply_stored(stored)
                    .wrap_err("applying stored calibration")?;
                info!(
                    zero_counts = stored.zero_counts,
                    scale_factor = stored.scale_factor,
                    "loaded persisted calibration"
                );
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "calibration store unreadable, using defaults"),
        }
        self.store = store;
        Ok(())
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// One raw sample, with the hardware error mapped to the typed
    /// taxonomy. Timeout is non-fatal to every caller.
    pub fn read_raw(&mut self) -> std::result::Result<i32, ScaleError> {
        self.front_end
            .read_raw(self.sensor_timeout)
            .map_err(|e| map_hw_error(&*e))
    }

    /// Convert a raw sample to a weight, applying the one-shot orientation
    /// correction when the reading is negative beyond the noise band.
    pub fn weight_from_raw(&mut self, raw: i32) -> f64 {
        let w = self.calibration.to_weight(raw);
        if !self.sign_corrected && w < -self.tare_cfg.orientation_noise_band {
            warn!(weight = w, "negative reading after tare, flipping factor sign");
            self.calibration.flip_sign();
            self.sign_corrected = true;
            self.persist();
            return self.calibration.to_weight(raw);
        }
        w
    }

    /// Average `samples` fresh raw readings, skipping individual timeouts,
    /// bounded by the overall attempt budget.
    fn collect_raw_average(&mut self, samples: u32) -> Result<f64> {
        let mut sum: i64 = 0;
        let mut collected: u32 = 0;
        let budget = self.tare_cfg.attempt_budget.max(samples);
        for _ in 0..budget {
            match self.read_raw() {
                Ok(v) => {
                    sum += i64::from(v);
                    collected += 1;
                    if collected == samples {
                        break;
                    }
                }
                Err(ScaleError::Timeout) => continue,
                Err(e) => return Err(eyre::Report::new(e)).wrap_err("reading front-end"),
            }
        }
        if collected == 0 {
            return Err(eyre::Report::new(ScaleError::InsufficientSamples));
        }
        Ok(sum as f64 / f64::from(collected))
    }

    fn averaged_weight(&mut self, samples: u32) -> Result<f64> {
        let raw = self.collect_raw_average(samples)?;
        Ok(self.calibration.to_weight(raw.round() as i32))
    }

    /// Tare: average fresh readings into a new zero offset, then verify
    /// the result reads near zero, retrying the whole procedure up to the
    /// configured attempt count. `ZeroingFailed` is non-fatal; the
    /// best-effort offset stays in effect.
    pub fn tare(&mut self) -> Result<()> {
        let mut last_check = 0.0;
        for attempt in 1..=self.tare_cfg.max_attempts {
            let avg = self.collect_raw_average(self.tare_cfg.samples)?;
            self.calibration.set_zero_counts(avg.round() as i64);

            let check = self.averaged_weight(VERIFY_SAMPLES)?;
            if check.abs() <= self.tare_cfg.zero_tolerance {
                info!(
                    zero_counts = self.calibration.zero_counts(),
                    attempt,
                    "tare complete"
                );
                self.persist();
                return Ok(());
            }
            last_check = check;
            warn!(check, attempt, "post-tare verification outside tolerance");
        }
        // Keep the last offset; the operator continues with a best-effort
        // zero.
        self.persist();
        Err(eyre::Report::new(ScaleError::ZeroingFailed(last_check)))
    }

    /// Calibrate against a known reference weight placed on a freshly
    /// tared scale. The known weight is expressed in base units (before
    /// the display divisor). Returns the new scale factor.
    pub fn calibrate(&mut self, known_weight: f64) -> Result<f64> {
        if known_weight <= 0.0 || !known_weight.is_finite() {
            return Err(eyre::Report::new(ScaleError::InvalidKnownWeight(
                known_weight,
            )));
        }
        let avg = self.collect_raw_average(self.tare_cfg.samples)?;
        let delta = avg - self.calibration.zero_counts() as f64;
        if delta == 0.0 {
            return Err(eyre::Report::new(ScaleError::Config(
                "no raw delta between tare and reference weight".into(),
            )));
        }
        let factor = known_weight / delta;
        self.calibration.set_scale_factor(factor);
        info!(scale_factor = factor, known_weight, "calibration updated");
        self.persist();
        Ok(factor)
    }

    /// Best-effort persistence after every calibration mutation.
    fn persist(&mut self) {
        if let Err(e) = self.store.save(self.calibration.stored()) {
            warn!(error = %e, "failed to persist calibration");
        }
    }
}
