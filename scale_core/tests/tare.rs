//! Tare, zero verification, orientation correction, and known-weight
//! calibration, driven through scripted front-ends.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rstest::rstest;

use scale_core::mocks::ScriptedFrontEnd;
use scale_core::{Calibration, Scale, ScaleError, TareCfg};
use scale_traits::{CalibrationStore, StoredCalibration};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn cfg() -> TareCfg {
    TareCfg {
        samples: 4,
        attempt_budget: 16,
        zero_tolerance: 0.5,
        max_attempts: 3,
        orientation_noise_band: 0.5,
    }
}

fn scale_with(fe: ScriptedFrontEnd, cal: Calibration) -> Scale<ScriptedFrontEnd> {
    Scale::new(fe, cal, cfg(), Duration::from_millis(50))
}

#[test]
fn tare_skips_timeouts_and_averages_fresh_readings() {
    let fe = ScriptedFrontEnd::with_timeouts([
        Err(()),
        Ok(100),
        Err(()),
        Ok(102),
        Ok(98),
        Ok(100),
        // exhausted: repeats 100 for verification
    ]);
    let mut scale = scale_with(fe, Calibration::default());
    scale.tare().unwrap();
    assert_eq!(scale.calibration().zero_counts(), 100);

    // A second tare on the same steady signal converges to the same zero.
    scale.tare().unwrap();
    assert_eq!(scale.calibration().zero_counts(), 100);
}

#[test]
fn tare_with_no_usable_samples_reports_insufficient() {
    let fe = ScriptedFrontEnd::with_timeouts(std::iter::repeat_n(Err(()), 16));
    let mut scale = scale_with(fe, Calibration::default());
    let err = scale.tare().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScaleError>(),
        Some(ScaleError::InsufficientSamples)
    ));
}

#[test]
fn drifting_signal_fails_verification_but_keeps_best_effort_zero() {
    // A monotonic ramp never verifies: every post-tare check reads the
    // ramp's slope, well outside tolerance.
    let fe = ScriptedFrontEnd::new(0..50);
    let mut scale = scale_with(fe, Calibration::default());
    let err = scale.tare().unwrap_err();
    match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::ZeroingFailed(check)) => assert!((check - 6.0).abs() < 1e-9),
        other => panic!("expected ZeroingFailed, got {other:?}"),
    }
    // Third attempt's offset stays in effect.
    assert_eq!(scale.calibration().zero_counts(), 26);
}

#[test]
fn orientation_flip_happens_at_most_once_per_boot() {
    let fe = ScriptedFrontEnd::new([]);
    let mut scale = scale_with(fe, Calibration::default());

    // A clearly negative reading flips the factor and re-converts.
    assert_eq!(scale.weight_from_raw(-10), 10.0);
    assert_eq!(scale.calibration().scale_factor(), -1.0);

    // The correction is latched: later negatives pass through unchanged.
    assert_eq!(scale.weight_from_raw(20), -20.0);
    assert_eq!(scale.calibration().scale_factor(), -1.0);
}

#[test]
fn negative_noise_inside_the_band_does_not_flip() {
    let fe = ScriptedFrontEnd::new([]);
    let cal = Calibration::new(0, 1.0, 10.0).unwrap();
    let mut scale = scale_with(fe, cal);
    assert!((scale.weight_from_raw(-4) - (-0.4)).abs() < 1e-12);
    assert_eq!(scale.calibration().scale_factor(), 1.0);
}

#[test]
fn calibrate_derives_factor_from_known_weight() {
    let fe = ScriptedFrontEnd::new([2100, 2100, 2100, 2100]);
    let cal = Calibration::new(100, 1.0, 1.0).unwrap();
    let mut scale = scale_with(fe, cal);

    let factor = scale.calibrate(100.0).unwrap();
    assert!((factor - 0.05).abs() < 1e-12);
    // Linearity check at the reference point.
    assert!((scale.calibration().to_weight(2100) - 100.0).abs() < 1e-9);
}

#[rstest]
#[case(0.0)]
#[case(-5.0)]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
fn calibrate_rejects_non_positive_known_weight(#[case] known: f64) {
    let fe = ScriptedFrontEnd::new([2100]);
    let mut scale = scale_with(fe, Calibration::default());
    let err = scale.calibrate(known).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScaleError>(),
        Some(ScaleError::InvalidKnownWeight(_))
    ));
}

#[test]
fn calibrate_rejects_zero_raw_delta() {
    let fe = ScriptedFrontEnd::new([100, 100, 100, 100]);
    let cal = Calibration::new(100, 1.0, 1.0).unwrap();
    let mut scale = scale_with(fe, cal);
    let err = scale.calibrate(50.0).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScaleError>(),
        Some(ScaleError::Config(_))
    ));
}

#[derive(Clone, Default)]
struct RecordingStore {
    preload: Option<StoredCalibration>,
    saved: Arc<Mutex<Vec<StoredCalibration>>>,
}

impl CalibrationStore for RecordingStore {
    fn load(&mut self) -> Result<Option<StoredCalibration>, BoxError> {
        Ok(self.preload)
    }
    fn save(&mut self, cal: StoredCalibration) -> Result<(), BoxError> {
        self.saved.lock().map_err(|_| "poisoned")?.push(cal);
        Ok(())
    }
}

#[test]
fn attached_store_is_loaded_on_attach_and_written_on_tare() {
    let fe = ScriptedFrontEnd::new([600, 600, 600, 600]);
    let mut scale = scale_with(fe, Calibration::default());

    let store = RecordingStore {
        preload: Some(StoredCalibration {
            zero_counts: 500,
            scale_factor: 2.0,
        }),
        ..Default::default()
    };
    let saved = Arc::clone(&store.saved);
    scale.attach_store(Box::new(store)).unwrap();
    assert_eq!(scale.calibration().zero_counts(), 500);
    assert_eq!(scale.calibration().scale_factor(), 2.0);

    scale.tare().unwrap();
    assert_eq!(scale.calibration().zero_counts(), 600);
    let saved = saved.lock().unwrap();
    assert_eq!(
        saved.last(),
        Some(&StoredCalibration {
            zero_counts: 600,
            scale_factor: 2.0,
        })
    );
}
