//! Hardware seams shared by the load-cell workspace.
//!
//! - `LoadCell`: anything that yields one raw 24-bit conversion per call.
//! - `ClockLine` / `DataLine`: the two wires of the bit-banged ADC protocol.
//! - `Clock`: monotonic time, replaceable in tests.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// One raw ADC conversion per call, sign-extended to `i32`.
///
/// Implementations block until the converter is ready or `timeout` expires.
pub trait LoadCell {
    fn read_raw(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: LoadCell + ?Sized> LoadCell for Box<T> {
    fn read_raw(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_raw(timeout)
    }
}

/// Serial clock output (idle low).
pub trait ClockLine {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// Data output of the converter, read by the host.
///
/// Low while idle means a conversion is ready.
pub trait DataLine {
    fn is_high(&mut self) -> bool;
}
