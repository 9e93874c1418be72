use std::time::Duration;

use loadcell_traits::{ClockLine, DataLine, LoadCell};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{polls_for, wait_until_low};

/// Channel/gain selected for the *next* conversion by the number of trailing
/// clock pulses after the 24 data bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    /// Channel A, gain 128 (1 extra pulse).
    #[default]
    A128,
    /// Channel B, gain 32 (2 extra pulses).
    B32,
    /// Channel A, gain 64 (3 extra pulses).
    A64,
}

impl Gain {
    #[inline]
    pub const fn pulses(self) -> u8 {
        match self {
            Gain::A128 => 1,
            Gain::B32 => 2,
            Gain::A64 => 3,
        }
    }
}

impl TryFrom<u32> for Gain {
    type Error = HwError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            128 => Ok(Gain::A128),
            64 => Ok(Gain::A64),
            32 => Ok(Gain::B32),
            other => Err(HwError::InvalidGain(other)),
        }
    }
}

/// Sign-extend a 24-bit two's complement value into an `i32`.
#[inline]
pub fn sign_extend_24(value: u32) -> i32 {
    let value = value & 0x00FF_FFFF;
    if value & 0x0080_0000 != 0 {
        (value | 0xFF00_0000) as i32
    } else {
        value as i32
    }
}

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(200);
pub const DEFAULT_MAX_POLLS: u32 = 750;

/// Bit-banged HX711 driver over any pair of clock/data lines.
pub struct Hx711<C, D> {
    sck: C,
    dt: D,
    gain: Gain,
    max_polls: u32,
    poll_interval: Duration,
}

impl<C: ClockLine, D: DataLine> Hx711<C, D> {
    /// Build a driver; the clock line is driven low (idle) immediately.
    pub fn new(mut sck: C, dt: D, gain: Gain) -> Self {
        sck.set_low();
        Self {
            sck,
            dt,
            gain,
            max_polls: DEFAULT_MAX_POLLS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_polling(mut self, max_polls: u32, poll_interval: Duration) -> Self {
        self.max_polls = max_polls.max(1);
        self.poll_interval = poll_interval;
        self
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Read one conversion and select `gain` for the following one.
    pub fn read_raw(&mut self, gain: Gain) -> Result<i32> {
        self.read_bounded(gain, self.max_polls)
    }

    fn read_bounded(&mut self, gain: Gain, max_polls: u32) -> Result<i32> {
        let dt = &mut self.dt;
        wait_until_low(|| dt.is_high(), max_polls, self.poll_interval)?;

        // 24 data bits, MSB first, sampled while the clock is high.
        let mut value: u32 = 0;
        for _ in 0..24 {
            self.sck.set_high();
            std::hint::spin_loop();
            value = (value << 1) | u32::from(self.dt.is_high());
            self.sck.set_low();
            std::hint::spin_loop();
        }

        for _ in 0..gain.pulses() {
            self.sck.set_high();
            std::hint::spin_loop();
            self.sck.set_low();
            std::hint::spin_loop();
        }
        self.gain = gain;

        let raw = sign_extend_24(value);
        trace!(raw, bits = value, ?gain, "hx711 raw read");
        Ok(raw)
    }
}

impl<C: ClockLine, D: DataLine> LoadCell for Hx711<C, D> {
    fn read_raw(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        let polls = polls_for(timeout, self.poll_interval).min(self.max_polls.max(1));
        let gain = self.gain;
        self.read_bounded(gain, polls).map_err(Into::into)
    }
}
