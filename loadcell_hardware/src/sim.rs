use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use loadcell_traits::LoadCell;

const RAW_MIN: i32 = -(1 << 23);
const RAW_MAX: i32 = (1 << 23) - 1;

/// Shared handle used to place or remove a simulated load.
#[derive(Debug, Clone, Default)]
pub struct SimulatedLoad(Arc<AtomicU32>);

impl SimulatedLoad {
    pub fn set_grams(&self, grams: f32) {
        self.0.store(grams.to_bits(), Ordering::Relaxed);
    }

    pub fn grams(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Simulated load cell producing HX711-like counts for the current load.
///
/// Counts are `zero_counts + grams * counts_per_gram` plus deterministic
/// pseudo-random noise, clamped to the 24-bit range.
#[derive(Debug)]
pub struct SimulatedScale {
    load: SimulatedLoad,
    zero_counts: i32,
    counts_per_gram: f32,
    noise_counts: u32,
    rng: u64,
}

impl Default for SimulatedScale {
    fn default() -> Self {
        Self::new(8_000, 420.0)
    }
}

impl SimulatedScale {
    pub fn new(zero_counts: i32, counts_per_gram: f32) -> Self {
        Self {
            load: SimulatedLoad::default(),
            zero_counts,
            counts_per_gram,
            noise_counts: 0,
            rng: 0x9E37_79B9_7F4A_7C15,
        }
    }

    pub fn with_noise(mut self, noise_counts: u32) -> Self {
        self.noise_counts = noise_counts;
        self
    }

    pub fn load(&self) -> SimulatedLoad {
        self.load.clone()
    }

    fn noise(&mut self) -> i32 {
        if self.noise_counts == 0 {
            return 0;
        }
        // xorshift64
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
        let span = u64::from(self.noise_counts) * 2 + 1;
        (x % span) as i32 - self.noise_counts as i32
    }
}

impl LoadCell for SimulatedScale {
    fn read_raw(
        &mut self,
        _timeout: Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        let ideal = f64::from(self.zero_counts)
            + f64::from(self.load.grams()) * f64::from(self.counts_per_gram);
        let noisy = ideal.round() as i64 + i64::from(self.noise());
        Ok(noisy.clamp(i64::from(RAW_MIN), i64::from(RAW_MAX)) as i32)
    }
}
