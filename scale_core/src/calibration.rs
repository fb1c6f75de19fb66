//! Linear raw-count to weight conversion.
//!
//! weight = (raw - zero_counts) * scale_factor / unit_divisor
//!
//! `zero_counts` is the tare baseline, `scale_factor` converts counts to
//! base physical units, and `unit_divisor` shifts to the display unit
//! (e.g. 1000.0 shows kilograms when the factor yields grams).

use crate::error::{Result, ScaleError};
use scale_traits::StoredCalibration;

#[derive(Debug, Clone)]
pub struct Calibration {
    zero_counts: i64,
    scale_factor: f64,
    unit_divisor: f64,
}

impl Calibration {
    /// A zero or non-finite scale factor would make every weight zero and
    /// is rejected up front.
    pub fn new(zero_counts: i64, scale_factor: f64, unit_divisor: f64) -> Result<Self> {
        if scale_factor == 0.0 || !scale_factor.is_finite() {
            return Err(eyre::Report::new(ScaleError::Config(
                "scale factor must be finite and nonzero".into(),
            )));
        }
        if unit_divisor == 0.0 || !unit_divisor.is_finite() {
            return Err(eyre::Report::new(ScaleError::Config(
                "unit divisor must be finite and nonzero".into(),
            )));
        }
        Ok(Self {
            zero_counts,
            scale_factor,
            unit_divisor,
        })
    }

    /// Pure conversion; `to_weight(zero_counts) == 0` by construction.
    #[inline]
    pub fn to_weight(&self, raw: i32) -> f64 {
        (i64::from(raw) - self.zero_counts) as f64 * self.scale_factor / self.unit_divisor
    }

    pub fn zero_counts(&self) -> i64 {
        self.zero_counts
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn unit_divisor(&self) -> f64 {
        self.unit_divisor
    }

    pub(crate) fn set_zero_counts(&mut self, zero: i64) {
        self.zero_counts = zero;
    }

    pub(crate) fn set_scale_factor(&mut self, factor: f64) {
        debug_assert!(factor != 0.0 && factor.is_finite());
        self.scale_factor = factor;
    }

    pub(crate) fn flip_sign(&mut self) {
        self.scale_factor = -self.scale_factor;
    }

    /// Apply a persisted pair, keeping the configured unit divisor.
    pub fn apply_stored(&mut self, stored: StoredCalibration) -> Result<()> {
        if stored.scale_factor == 0.0 || !stored.scale_factor.is_finite() {
            return Err(eyre::Report::new(ScaleError::Config(
                "stored scale factor must be finite and nonzero".into(),
            )));
        }
        self.zero_counts = stored.zero_counts;
        self.scale_factor = stored.scale_factor;
        Ok(())
    }

    pub fn stored(&self) -> StoredCalibration {
        StoredCalibration {
            zero_counts: self.zero_counts,
            scale_factor: self.scale_factor,
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            zero_counts: 0,
            scale_factor: 1.0,
            unit_divisor: 1.0,
        }
    }
}
