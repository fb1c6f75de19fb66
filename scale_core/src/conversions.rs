//! Mappings from the serde config schema into core types.

use crate::calibration::Calibration;
use crate::scale::TareCfg;
use crate::session::SessionCfg;

impl From<&scale_config::Config> for SessionCfg {
    fn from(cfg: &scale_config::Config) -> Self {
        Self {
            presence_threshold: cfg.session.presence_threshold,
            zero_band: cfg.session.zero_band,
            stable_stddev: cfg.stability.stable_stddev,
            stable_min_ms: cfg.session.stable_min_ms,
            weighing_timeout_ms: cfg.session.weighing_timeout_ms,
            no_id_zero_timeout_ms: cfg.session.no_id_zero_timeout_ms,
            display_zero_clamp: cfg.session.display_zero_clamp,
        }
    }
}

impl From<&scale_config::TareCfg> for TareCfg {
    fn from(t: &scale_config::TareCfg) -> Self {
        Self {
            samples: t.samples,
            attempt_budget: t.attempt_budget,
            zero_tolerance: t.zero_tolerance,
            max_attempts: t.max_attempts,
            orientation_noise_band: t.orientation_noise_band,
        }
    }
}

impl TryFrom<&scale_config::PersistedCalibration> for Calibration {
    type Error = eyre::Report;
    fn try_from(p: &scale_config::PersistedCalibration) -> Result<Self, Self::Error> {
        Calibration::new(p.zero_counts, p.scale_factor, p.unit_divisor)
    }
}
