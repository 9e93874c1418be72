use std::collections::VecDeque;

use super::Filter;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MedianParams {
    pub min_samples: usize,
    /// Zero disables the stage.
    pub max_samples: usize,
    pub step_increase: usize,
    /// Change relative to the last output (percent) that counts as a step.
    pub step_pct: f32,
}

impl Default for MedianParams {
    fn default() -> Self {
        Self {
            min_samples: 3,
            max_samples: 15,
            step_increase: 4,
            step_pct: 5.0,
        }
    }
}

/// Median filter whose window widens on steps and narrows by one otherwise.
#[derive(Debug, Clone)]
pub struct AdaptiveMedian {
    params: MedianParams,
    buf: VecDeque<f32>,
    scratch: Vec<f32>,
    window: usize,
    filled: bool,
    last_output: Option<f32>,
}

impl AdaptiveMedian {
    pub fn new(params: MedianParams) -> Self {
        let max = params.max_samples;
        let min = params.min_samples.clamp(1, max.max(1));
        let params = MedianParams {
            min_samples: min,
            ..params
        };
        Self {
            params,
            buf: VecDeque::with_capacity(max),
            scratch: Vec::with_capacity(max),
            window: min,
            filled: false,
            last_output: None,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn is_filled(&self) -> bool {
        self.filled
    }

    pub fn is_enabled(&self) -> bool {
        self.params.max_samples > 0
    }

    fn is_step(&self, value: f32) -> bool {
        self.last_output.is_some_and(|last| {
            let limit = self.params.step_pct / 100.0 * last.abs().max(1.0);
            (value - last).abs() > limit
        })
    }

    fn median(&mut self) -> f32 {
        self.scratch.clear();
        self.scratch.extend(self.buf.iter().copied());
        self.scratch.sort_by(f32::total_cmp);
        let n = self.scratch.len();
        if n % 2 == 1 {
            self.scratch[n / 2]
        } else {
            (self.scratch[n / 2 - 1] + self.scratch[n / 2]) / 2.0
        }
    }
}

impl Filter for AdaptiveMedian {
    fn reset(&mut self, seed: f32) {
        self.buf.clear();
        self.window = self.params.min_samples;
        self.filled = false;
        self.last_output = Some(seed);
    }

    fn update(&mut self, value: f32) -> f32 {
        if !self.is_enabled() {
            return value;
        }
        if self.last_output.is_some() {
            self.window = if self.is_step(value) {
                (self.window + self.params.step_increase).min(self.params.max_samples)
            } else {
                self.window.saturating_sub(1).max(self.params.min_samples)
            };
        }
        self.buf.push_back(value);
        while self.buf.len() > self.window {
            self.buf.pop_front();
        }
        if !self.filled && self.buf.len() >= self.window {
            self.filled = true;
        }
        let out = if self.filled { self.median() } else { value };
        self.last_output = Some(out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_until_first_fill() {
        let mut m = AdaptiveMedian::new(MedianParams::default());
        assert_eq!(m.update(10.0), 10.0);
        assert_eq!(m.update(10.2), 10.2);
        assert!(!m.is_filled());
        assert_eq!(m.update(10.1), 10.1);
        assert!(m.is_filled());
        assert_eq!(m.update(10.15), 10.15);
    }

    #[test]
    fn rejects_single_outlier_once_filled() {
        let mut m = AdaptiveMedian::new(MedianParams {
            step_pct: 50.0,
            ..MedianParams::default()
        });
        for _ in 0..5 {
            m.update(100.0);
        }
        assert_eq!(m.update(130.0), 100.0);
    }

    #[test]
    fn disabled_is_identity() {
        let mut m = AdaptiveMedian::new(MedianParams {
            max_samples: 0,
            ..MedianParams::default()
        });
        assert_eq!(m.update(42.0), 42.0);
        assert_eq!(m.update(-1.0), -1.0);
    }
}
