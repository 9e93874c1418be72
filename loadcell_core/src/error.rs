use thiserror::Error;

/// Failures of the tare / fit / calibration procedure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("no samples to average")]
    EmptyInput,
    #[error("degenerate calibration: known weight is zero")]
    DegenerateWeight,
    #[error("degenerate calibration: reading at known weight equals zero reading ({raw})")]
    DegenerateSpan { raw: i32 },
    #[error("degenerate calibration: all raw values are identical")]
    DegenerateInput,
    #[error("calibration needs at least 2 points, got {got}")]
    InsufficientPoints { got: usize },
    #[error("calibration input length mismatch: {raw} raw values, {weights} weights")]
    LengthMismatch { raw: usize, weights: usize },
    #[error("calibration produced a non-finite or zero slope")]
    InvalidSlope,
    #[error("reading failed during calibration: {0}")]
    Acquisition(String),
}

impl CalibrationError {
    /// True for inputs that would produce an infinite or zero slope.
    pub fn is_degenerate(&self) -> bool {
        matches!(
            self,
            Self::DegenerateWeight
                | Self::DegenerateSpan { .. }
                | Self::DegenerateInput
                | Self::InvalidSlope
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScaleError {
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("shared state busy (lock timeout)")]
    LockTimeout,
    #[error("sample queue full")]
    QueueFull,
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("unknown threshold: {0}")]
    UnknownThreshold(String),
    #[error("invalid value {value} for threshold {name}")]
    InvalidThreshold { name: &'static str, value: f32 },
    #[error("invalid state: {0}")]
    State(String),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
