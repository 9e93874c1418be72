use tracing::debug;

use super::{AdaptiveKalman, AdaptiveMedian, Filter, KalmanParams, MedianParams, MovingAverage};

/// Which of the two alternative pipelines runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Moving average, then adaptive Kalman, with step boosting.
    #[default]
    Smoothing,
    /// Adaptive-window median on raw counts.
    Median,
}

/// Step-change handling for the smoothing pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostParams {
    /// Jump (counts) between a new reading and the last output that counts as a step.
    pub step_threshold: f32,
    pub boosted_q: f32,
    pub normal_q: f32,
    pub samples: u32,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            step_threshold: 1000.0,
            boosted_q: 10.0,
            normal_q: 0.5,
            samples: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterPipeline {
    mode: FilterMode,
    ma: MovingAverage,
    kalman: Option<AdaptiveKalman>,
    median: AdaptiveMedian,
    boost: BoostParams,
    boost_remaining: u32,
    last_output: Option<f32>,
}

impl FilterPipeline {
    pub fn new(
        mode: FilterMode,
        ma_window: usize,
        kalman: Option<KalmanParams>,
        boost: BoostParams,
        median: MedianParams,
    ) -> Self {
        Self {
            mode,
            ma: MovingAverage::new(ma_window),
            kalman: kalman.map(AdaptiveKalman::new),
            median: AdaptiveMedian::new(median),
            boost,
            boost_remaining: 0,
            last_output: None,
        }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn last_output(&self) -> Option<f32> {
        self.last_output
    }

    pub fn kalman(&self) -> Option<&AdaptiveKalman> {
        self.kalman.as_ref()
    }

    pub fn median(&self) -> &AdaptiveMedian {
        &self.median
    }

    pub fn is_boosting(&self) -> bool {
        self.boost_remaining > 0
    }

    pub fn step_threshold(&self) -> f32 {
        self.boost.step_threshold
    }

    pub fn set_step_threshold(&mut self, counts: f32) {
        if counts.is_finite() && counts > 0.0 {
            self.boost.step_threshold = counts;
        }
    }

    /// Seed every stage with the first reading.
    fn prime(&mut self, value: f32) {
        self.ma.reset(value);
        if let Some(k) = self.kalman.as_mut() {
            k.reset(value);
        }
        self.median.reset(value);
        self.boost_remaining = 0;
        self.last_output = Some(value);
    }

    /// Feed one raw reading (counts) and return the filtered value.
    pub fn process(&mut self, raw: f32) -> f32 {
        let Some(last) = self.last_output else {
            self.prime(raw);
            return raw;
        };
        let out = match self.mode {
            FilterMode::Median => self.median.update(raw),
            FilterMode::Smoothing => self.smooth(raw, last),
        };
        self.last_output = Some(out);
        out
    }

    fn smooth(&mut self, raw: f32, last: f32) -> f32 {
        let step = (raw - last).abs() > self.boost.step_threshold;
        if step {
            debug!(raw, last, "step change, boosting filters");
            self.boost_remaining = self.boost.samples;
        }
        if step || self.boost_remaining > 0 {
            self.ma.reset(raw);
        }
        let smoothed = self.ma.update(raw);

        let Some(k) = self.kalman.as_mut() else {
            self.boost_remaining = self.boost_remaining.saturating_sub(1);
            return smoothed;
        };
        if self.boost_remaining > 0 {
            k.set_boost(Some(self.boost.boosted_q));
            self.boost_remaining -= 1;
        } else if k.boost().is_some() {
            k.set_boost(None);
            k.set_q(self.boost.normal_q);
        }
        k.update(smoothed)
    }
}

impl Filter for FilterPipeline {
    fn reset(&mut self, seed: f32) {
        self.prime(seed);
    }

    fn update(&mut self, value: f32) -> f32 {
        self.process(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smoothing() -> FilterPipeline {
        FilterPipeline::new(
            FilterMode::Smoothing,
            8,
            Some(KalmanParams::default()),
            BoostParams::default(),
            MedianParams::default(),
        )
    }

    #[test]
    fn first_reading_primes_without_lag() {
        let mut p = smoothing();
        assert_eq!(p.process(50_000.0), 50_000.0);
        let second = p.process(50_000.0);
        assert!((second - 50_000.0).abs() < 1e-2, "second = {second}");
    }

    #[test]
    fn boost_lasts_configured_samples() {
        let mut p = FilterPipeline::new(
            FilterMode::Smoothing,
            8,
            Some(KalmanParams::default()),
            BoostParams {
                boosted_q: 1000.0,
                ..BoostParams::default()
            },
            MedianParams::default(),
        );
        for _ in 0..50 {
            p.process(0.0);
        }
        p.process(20_000.0);
        let mut boosted = 1;
        while p.is_boosting() {
            p.process(20_000.0);
            boosted += 1;
        }
        assert_eq!(boosted, 5);
        p.process(20_000.0);
        let k = p.kalman().expect("kalman enabled");
        assert!(k.boost().is_none());
        assert!(k.q() <= KalmanParams::default().q_max);
    }

    #[test]
    fn median_mode_skips_smoothing() {
        let mut p = FilterPipeline::new(
            FilterMode::Median,
            8,
            Some(KalmanParams::default()),
            BoostParams::default(),
            MedianParams::default(),
        );
        p.process(100.0);
        for _ in 0..4 {
            p.process(100.0);
        }
        assert_eq!(p.process(101.0), 100.0);
    }
}
