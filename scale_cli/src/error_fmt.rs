//! Human-readable error descriptions and structured JSON error formatting.

use scale_core::ScaleError;

/// Map an eyre::Report to a human-readable explanation with likely causes
/// and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(se) = err.downcast_ref::<ScaleError>() {
        return match se {
            ScaleError::Timeout => {
                "What happened: The front-end did not produce a sample within the configured timeout.\nLikely causes: Wiring/power issues on the ADC, or timeouts.sensor_ms set too low.\nHow to fix: Check the [pins] wiring and raise timeouts.sensor_ms in the config.".to_string()
            }
            ScaleError::InsufficientSamples => {
                "What happened: No usable samples were collected within the attempt budget.\nLikely causes: The converter never signalled data-ready; wiring or power problem.\nHow to fix: Verify the front-end wiring, then raise tare.attempt_budget if the signal is just slow.".to_string()
            }
            ScaleError::ZeroingFailed(check) => format!(
                "What happened: The scale could not verify a stable zero (residual {check:.3}).\nLikely causes: Something on the platform, drafts, or vibration during tare.\nHow to fix: Empty and shelter the platform, then run `tare` again. The best-effort offset stays in effect."
            ),
            ScaleError::InvalidKnownWeight(w) => format!(
                "What happened: {w} is not a valid reference weight.\nHow to fix: Pass a positive, finite --known value in base units."
            ),
            _ => format!(
                "What happened: {se}.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();
    if lower.contains("requires a linux build") {
        return format!(
            "{msg}\nHow to fix: Build with `--features hardware` on the target device, or set frontend.kind = \"simulated\"."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error class; generic failures return 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::InvalidKnownWeight(_)) => 2,
        Some(ScaleError::ZeroingFailed(_)) => 3,
        Some(ScaleError::Timeout) => 4,
        Some(ScaleError::InsufficientSamples) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::Timeout) => "Timeout",
        Some(ScaleError::InsufficientSamples) => "InsufficientSamples",
        Some(ScaleError::ZeroingFailed(_)) => "ZeroingFailed",
        Some(ScaleError::InvalidKnownWeight(_)) => "InvalidKnownWeight",
        Some(ScaleError::Config(_)) => "Config",
        _ => "Error",
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}
