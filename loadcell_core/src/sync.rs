//! Short-timeout locking for state shared with the acquisition task.
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use crate::error::ScaleError;

const RETRY_INTERVAL: Duration = Duration::from_micros(50);

/// Try to take `m` for at most `timeout`.
///
/// A poisoned lock is recovered: the guarded state is plain numeric data
/// that stays usable after a panicking holder.
pub fn lock_with_timeout<T>(m: &Mutex<T>, timeout: Duration) -> Result<MutexGuard<'_, T>, ScaleError> {
    let deadline = Instant::now() + timeout;
    loop {
        match m.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(p)) => return Ok(p.into_inner()),
            Err(TryLockError::WouldBlock) => {
                if Instant::now() >= deadline {
                    return Err(ScaleError::LockTimeout);
                }
                std::thread::sleep(RETRY_INTERVAL);
            }
        }
    }
}
