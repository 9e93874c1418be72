//! Signal conditioning stages.
//!
//! Every stage works on counts (not grams) and exposes the same
//! `reset(seed)` / `update(value)` pair so stages can be driven uniformly.
pub mod kalman;
pub mod median;
pub mod moving_average;
pub mod pipeline;

pub use kalman::{AdaptiveKalman, KalmanParams};
pub use median::{AdaptiveMedian, MedianParams};
pub use moving_average::MovingAverage;
pub use pipeline::{BoostParams, FilterMode, FilterPipeline};

pub trait Filter {
    /// Discard history and restart from `seed`.
    fn reset(&mut self, seed: f32);
    /// Feed one value, returning the filtered output.
    fn update(&mut self, value: f32) -> f32;
}
