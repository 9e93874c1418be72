use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("hx711 data-ready timeout after {polls} polls")]
    DataReadyTimeout { polls: u32 },
    #[error("invalid gain setting: {0}")]
    InvalidGain(u32),
}

pub type Result<T> = std::result::Result<T, HwError>;
