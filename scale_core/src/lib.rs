#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core weighing-station logic (hardware-agnostic).
//!
//! All hardware interactions go through the `scale_traits` capability
//! traits; the crate itself only knows raw counts, weights, and time.
//!
//! ## Architecture
//!
//! - **Calibration**: linear raw→weight conversion (`calibration`)
//! - **Acquisition**: tare, zero verification, known-weight calibration,
//!   orientation correction (`scale`)
//! - **Stability**: O(1) rolling mean/stddev ring (`stability`)
//! - **Session**: the Idle/Weighing/AwaitingIdentity/AwaitingRemoval
//!   state machine, pure tick → effects (`session`)
//! - **Runner**: the cooperative sampling loop and effect executor
//!   (`runner`), with uploads dispatched off-thread (`uplink`)

pub mod calibration;
pub mod conversions;
pub mod error;
pub mod mocks;
pub mod runner;
pub mod scale;
pub mod session;
pub mod stability;
pub mod uplink;

pub use calibration::Calibration;
pub use error::{Result, ScaleError};
pub use runner::{Command, Station, StationHandle};
pub use scale::{Scale, TareCfg};
pub use session::{Effect, SessionCfg, SessionController, SessionState};
pub use stability::{StabilityBuffer, Stats};
pub use uplink::{UploadDispatcher, UploadEvent};
