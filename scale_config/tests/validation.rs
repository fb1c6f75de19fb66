use rstest::rstest;
use scale_config::{FrontEndKind, load_toml};
use scale_traits::{CalibrationStore, StoredCalibration};

const GOOD: &str = r#"
    [frontend]
    kind = "bitbang"

    [pins]
    adc_dout = 34
    adc_sclk = 4

    [stability]
    capacity = 10
    stable_stddev = 0.03

    [session]
    presence_threshold = 0.05
    zero_band = 0.03
    stable_min_ms = 1500
    weighing_timeout_ms = 15000
    no_id_zero_timeout_ms = 10000
    tick_ms = 100

    [tare]
    samples = 16
    attempt_budget = 64

    [timeouts]
    sensor_ms = 500

    [calibration]
    zero_counts = 1200
    scale_factor = 0.00045
    unit_divisor = 1000.0
"#;

#[test]
fn parses_and_validates_full_config() {
    let cfg = load_toml(GOOD).expect("parse");
    assert_eq!(cfg.frontend.kind, FrontEndKind::Bitbang);
    assert_eq!(cfg.stability.capacity, 10);
    assert_eq!(cfg.calibration.zero_counts, 1200);
    cfg.validate().expect("valid");
}

#[test]
fn empty_document_uses_defaults() {
    let cfg = load_toml("").expect("parse");
    assert_eq!(cfg.frontend.kind, FrontEndKind::Simulated);
    assert_eq!(cfg.session.tick_ms, 100);
    cfg.validate().expect("defaults are valid");
}

#[rstest]
#[case("[stability]\ncapacity = 1", "capacity")]
#[case("[stability]\nstable_stddev = 0.0", "stable_stddev")]
#[case("[session]\npresence_threshold = 0.0", "presence_threshold")]
#[case("[session]\nzero_band = 0.2", "zero_band")]
#[case("[session]\ntick_ms = 0", "tick_ms")]
#[case("[session]\nweighing_timeout_ms = 100\nstable_min_ms = 1500", "weighing_timeout_ms")]
#[case("[tare]\nsamples = 0", "samples")]
#[case("[tare]\nattempt_budget = 2\nsamples = 16", "attempt_budget")]
#[case("[timeouts]\nsensor_ms = 0", "sensor_ms")]
#[case("[calibration]\nscale_factor = 0.0", "scale_factor")]
#[case("[calibration]\nunit_divisor = 0.0", "unit_divisor")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        err.to_string().contains(needle),
        "error {err} should mention {needle}"
    );
}

#[test]
fn unknown_frontend_kind_fails_to_parse() {
    assert!(load_toml("[frontend]\nkind = \"quantum\"").is_err());
}

#[test]
fn calibration_file_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("cal.toml");
    let mut store = scale_config::CalibrationFile::new(&path);

    // Missing file is not an error.
    assert!(store.load().expect("load").is_none());

    let cal = StoredCalibration {
        zero_counts: -48_213,
        scale_factor: -0.006,
    };
    store.save(cal).expect("save");
    let loaded = store.load().expect("load").expect("present");
    assert_eq!(loaded, cal);
}
