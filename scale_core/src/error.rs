use thiserror::Error;

/// Failure taxonomy of the acquisition/calibration layer.
///
/// None of these are fatal to the session loop: a timeout tick is "no new
/// sample", a failed tare keeps the prior offset, and a failed zero
/// verification leaves the best-effort offset in place.
#[derive(Debug, Error, Clone)]
pub enum ScaleError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("timeout waiting for sample")]
    Timeout,
    #[error("tare collected no usable samples")]
    InsufficientSamples,
    #[error("post-tare verification outside tolerance (read {0:.4})")]
    ZeroingFailed(f64),
    #[error("known calibration weight must be positive, got {0}")]
    InvalidKnownWeight(f64),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Map a boxed front-end error to a typed `ScaleError`, downcasting the
/// hardware error type when the `hardware-errors` feature is enabled.
pub(crate) fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ScaleError {
    #[cfg(feature = "hardware-errors")]
    if let Some(hw) = e.downcast_ref::<scale_hardware::error::HwError>() {
        return match hw {
            scale_hardware::error::HwError::Timeout => ScaleError::Timeout,
            other => ScaleError::Hardware(other.to_string()),
        };
    }
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        ScaleError::Timeout
    } else {
        ScaleError::Hardware(s)
    }
}
