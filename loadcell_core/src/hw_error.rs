//! Maps `Box<dyn Error>` from trait boundaries to typed `ScaleError`.
//!
//! `LoadCell` returns `Box<dyn Error + Send + Sync>`; this module converts
//! those to our typed error enum, with an optional feature-gated path for
//! `loadcell_hardware::HwError` downcasting.

use crate::error::ScaleError;

/// Map a trait-boundary error to a typed `ScaleError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ScaleError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<loadcell_hardware::HwError>() {
            return match hw {
                loadcell_hardware::HwError::DataReadyTimeout { .. } => ScaleError::Timeout,
                other => ScaleError::HardwareFault(other.to_string()),
            };
        }
    }

    if let Some(se) = e.downcast_ref::<ScaleError>() {
        return se.clone();
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        ScaleError::Timeout
    } else {
        ScaleError::Hardware(s)
    }
}
