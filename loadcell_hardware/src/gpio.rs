//! Raspberry Pi GPIO wiring for the HX711 (feature `hardware`).
use rppal::gpio::{Gpio, InputPin, OutputPin};

use loadcell_traits::{ClockLine, DataLine};

use crate::error::{HwError, Result};
use crate::hx711::{Gain, Hx711};

pub struct PiClock(OutputPin);

impl ClockLine for PiClock {
    #[inline]
    fn set_high(&mut self) {
        self.0.set_high();
    }

    #[inline]
    fn set_low(&mut self) {
        self.0.set_low();
    }
}

pub struct PiData(InputPin);

impl DataLine for PiData {
    #[inline]
    fn is_high(&mut self) -> bool {
        self.0.is_high()
    }
}

pub type HardwareScale = Hx711<PiClock, PiData>;

/// Claim the DT/SCK pins and build a driver. SCK starts low.
pub fn open_hx711(dt_pin: u8, sck_pin: u8, gain: Gain) -> Result<HardwareScale> {
    let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
    let dt = gpio
        .get(dt_pin)
        .map_err(|e| HwError::Gpio(format!("claim DT pin {dt_pin}: {e}")))?
        .into_input();
    let sck = gpio
        .get(sck_pin)
        .map_err(|e| HwError::Gpio(format!("claim SCK pin {sck_pin}: {e}")))?
        .into_output_low();
    tracing::info!(dt_pin, sck_pin, ?gain, "hx711 pins claimed");
    Ok(Hx711::new(PiClock(sck), PiData(dt), gain))
}
