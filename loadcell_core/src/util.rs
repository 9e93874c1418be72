//! Common time/period helpers for loadcell_core.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Compute the period in microseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Percentage change of `value` relative to `reference`.
///
/// A zero reference yields 0 for an unchanged value and infinity otherwise.
#[inline]
pub fn pct_change(value: f32, reference: f32) -> f32 {
    let delta = (value - reference).abs();
    if reference.abs() <= f32::EPSILON {
        if delta <= f32::EPSILON { 0.0 } else { f32::INFINITY }
    } else {
        delta / reference.abs() * 100.0
    }
}
