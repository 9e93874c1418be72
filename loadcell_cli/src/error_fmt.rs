//! Human-readable error descriptions and structured JSON error formatting.

use loadcell_core::{CalibrationError, ScaleError};
use loadcell_hardware::HwError;

const TIMED_OUT: &str = "What happened: Scale read timed out.\nLikely causes: HX711 not wired correctly, no power/ground, or timeout too low.\nHow to fix: Verify DT/SCK pins and power, and consider increasing acquisition.read_timeout_ms in the config.";

fn scale_error(err: &eyre::Report) -> Option<&ScaleError> {
    err.downcast_ref::<ScaleError>()
}

fn calibration_error(err: &eyre::Report) -> Option<&CalibrationError> {
    err.downcast_ref::<CalibrationError>().or(match scale_error(err) {
        Some(ScaleError::Calibration(c)) => Some(c),
        _ => None,
    })
}

/// Sensor never signalled data-ready, directly or during a tare/calibration.
fn is_sensor_timeout(err: &eyre::Report) -> bool {
    if matches!(scale_error(err), Some(ScaleError::Timeout)) {
        return true;
    }
    if matches!(err.downcast_ref::<HwError>(), Some(HwError::DataReadyTimeout { .. })) {
        return true;
    }
    matches!(calibration_error(err), Some(CalibrationError::Acquisition(msg)) if msg.contains("timeout"))
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if is_sensor_timeout(err) {
        return TIMED_OUT.to_string();
    }

    if let Some(ce) = calibration_error(err) {
        if ce.is_degenerate() {
            return format!(
                "What happened: Calibration is degenerate ({ce}).\nLikely causes: The known weight was not on the scale while measuring, or the load cell does not respond to load.\nHow to fix: Keep the weight on the platform until calibration completes, check the load-cell wiring, then rerun `calibrate`."
            );
        }
        return format!(
            "What happened: Calibration failed ({ce}).\nLikely causes: Too few or inconsistent calibration points, or unstable readings.\nHow to fix: Check the calibration CSV or rerun `calibrate` with the scale undisturbed."
        );
    }

    if let Some(se) = scale_error(err) {
        return match se {
            ScaleError::HardwareFault(msg) | ScaleError::Hardware(msg) => format!(
                "What happened: The load cell reported a fault ({msg}).\nLikely causes: Loose wiring or a failing HX711 board.\nHow to fix: Check the connections and power, then run `self-check`."
            ),
            ScaleError::UnknownThreshold(name) => format!(
                "What happened: Unknown threshold {name:?}.\nHow to fix: Use one of wake, sleep, step, presence, change_pct, auto_tare_band."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(HwError::Gpio(msg)) = err.downcast_ref::<HwError>() {
        return format!(
            "What happened: Failed to initialize hardware pins ({msg}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'raw,grams'.".to_string();
    }

    if lower.contains("open hx711") {
        return "What happened: Failed to initialize hardware pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nLikely causes: Missing [pins] (hx711_dt, hx711_sck) or out-of-range values.\nHow to fix: Edit the TOML config and try again. Details: {msg}"
        );
    }

    if lower.contains("no calibration available") {
        return format!(
            "What happened: {msg}.\nHow to fix: Run `calibrate` once and copy g_per_count into the [calibration] section."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 sensor/hardware, 4 calibration, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if is_sensor_timeout(err)
        || err.downcast_ref::<HwError>().is_some()
        || matches!(
            scale_error(err),
            Some(ScaleError::HardwareFault(_) | ScaleError::Hardware(_))
        )
    {
        return 3;
    }
    if calibration_error(err).is_some() {
        return 4;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if is_sensor_timeout(err) {
        return "Timeout";
    }
    match exit_code_for_error(err) {
        3 => "HardwareFault",
        4 => "Calibration",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "message": humanize(err),
        "code": exit_code_for_error(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_during_tare_reads_as_timeout() {
        let err = eyre::Report::new(CalibrationError::Acquisition(
            ScaleError::Timeout.to_string(),
        ));
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("Scale read timed out"));
    }

    #[test]
    fn degenerate_calibration_exit_code() {
        let err = eyre::Report::new(CalibrationError::DegenerateInput);
        assert_eq!(exit_code_for_error(&err), 4);
        assert!(humanize(&err).contains("degenerate"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Calibration");
    }

    #[test]
    fn plain_errors_fall_back() {
        let err = eyre::eyre!("something odd");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("Original: something odd"));
    }
}
