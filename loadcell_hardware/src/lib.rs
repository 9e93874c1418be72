//! HX711 load-cell front end: bit-bang driver, simulated cell and GPIO wiring.
pub mod error;
pub mod hx711;
pub mod sim;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

pub use error::HwError;
pub use hx711::{Gain, Hx711, sign_extend_24};
pub use sim::{SimulatedLoad, SimulatedScale};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::{HardwareScale, open_hx711};
