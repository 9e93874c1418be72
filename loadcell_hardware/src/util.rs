use std::time::Duration;

use crate::error::{HwError, Result};

/// Wait until the provided `is_high` predicate becomes false (i.e., line goes low),
/// checking it at most `max_polls` times. Sleeps `poll_interval` between checks so a
/// shared core is not starved; a zero interval spins instead.
pub fn wait_until_low(
    mut is_high: impl FnMut() -> bool,
    max_polls: u32,
    poll_interval: Duration,
) -> Result<()> {
    let max_polls = max_polls.max(1);
    let mut polls: u32 = 0;
    while is_high() {
        polls = polls.saturating_add(1);
        if polls >= max_polls {
            return Err(HwError::DataReadyTimeout { polls });
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
    Ok(())
}

/// Number of polls that fit into `timeout` at the given interval (at least one).
pub fn polls_for(timeout: Duration, poll_interval: Duration) -> u32 {
    if poll_interval.is_zero() {
        return u32::try_from(timeout.as_micros()).unwrap_or(u32::MAX).max(1);
    }
    let n = timeout.as_nanos() / poll_interval.as_nanos();
    u32::try_from(n).unwrap_or(u32::MAX).max(1)
}
