//! Capability traits at the seam between the weighing core and its
//! peripherals.
//!
//! The core never talks to hardware directly: the analog front-end, the
//! display surface, the identity-tag reader, the uploader, and the
//! persisted-calibration store are all trait objects provided at
//! construction time.

pub mod clock;

pub use clock::{Clock, MonotonicClock, TestClock};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Analog front-end for the load cell.
///
/// Both supported variants implement this: the bit-banged 24-bit ADC
/// (raw counts) and the I2C averaging front-end (milli-units presented
/// as counts with a fixed 1e-3 calibration factor).
pub trait FrontEnd {
    /// Acquire one signed raw sample, waiting up to `timeout` for the
    /// converter's data-ready signal. A timeout is never fatal; callers
    /// treat it as "no new sample this tick".
    fn read_raw(&mut self, timeout: std::time::Duration) -> Result<i32, BoxError>;
}

impl<T: FrontEnd + ?Sized> FrontEnd for Box<T> {
    fn read_raw(&mut self, timeout: std::time::Duration) -> Result<i32, BoxError> {
        (**self).read_raw(timeout)
    }
}

/// Line-oriented text display sink.
pub trait LineDisplay {
    fn show_line(&mut self, row: u8, text: &str) -> Result<(), BoxError>;
    fn clear(&mut self) -> Result<(), BoxError>;
}

/// Identity-tag reader. `poll` returns `Some(id)` only when a new,
/// distinct, non-empty identifier has been observed since the last poll.
pub trait TagReader {
    fn poll(&mut self) -> Result<Option<String>, BoxError>;
}

/// Fire-and-forget network uploader for a finished weighing.
pub trait Uploader {
    fn send(&mut self, tag: &str, weight: f64) -> Result<(), BoxError>;
}

/// Persisted zero-offset / scale-factor pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredCalibration {
    pub zero_counts: i64,
    pub scale_factor: f64,
}

/// Backing store for calibration. Absence of a stored value is not an
/// error; the compiled-in default applies.
pub trait CalibrationStore {
    fn load(&mut self) -> Result<Option<StoredCalibration>, BoxError>;
    fn save(&mut self, cal: StoredCalibration) -> Result<(), BoxError>;
}

/// Store that never persists anything; used when no backing file is
/// configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl CalibrationStore for NullStore {
    fn load(&mut self) -> Result<Option<StoredCalibration>, BoxError> {
        Ok(None)
    }
    fn save(&mut self, _cal: StoredCalibration) -> Result<(), BoxError> {
        Ok(())
    }
}
