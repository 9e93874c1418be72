/// One published acquisition result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSample {
    /// Calibrated, filtered weight.
    pub value_g: f32,
    /// Filtered reading in ADC counts (before calibration).
    pub raw_counts: f32,
    /// Milliseconds since the acquisition task started.
    pub timestamp_ms: u64,
}

/// Latest raw + filtered pair for synchronous "current reading" queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Increments once per processed sample.
    pub seq: u64,
    pub raw: i32,
    pub filtered_counts: f32,
    pub weight_g: f32,
    pub timestamp_ms: u64,
}
