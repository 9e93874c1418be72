use super::Filter;

/// Circular-buffer running mean.
///
/// Before the buffer fills, the mean is taken over the samples seen so far.
/// A zero-sized window passes values through unchanged.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    buf: Vec<f32>,
    sum: f64,
    count: usize,
    index: usize,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            buf: vec![0.0; window],
            sum: 0.0,
            count: 0,
            index: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Running sum; equals the sum of the filled slots.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Recomputed sum of the filled slots (for checking `sum`).
    pub fn buffered_sum(&self) -> f64 {
        self.buf[..self.count].iter().map(|&v| f64::from(v)).sum()
    }
}

impl Filter for MovingAverage {
    fn reset(&mut self, seed: f32) {
        let n = self.buf.len();
        if n == 0 {
            return;
        }
        self.buf.fill(0.0);
        self.buf[0] = seed;
        self.sum = f64::from(seed);
        self.count = 1;
        self.index = 1 % n;
    }

    fn update(&mut self, value: f32) -> f32 {
        let n = self.buf.len();
        if n == 0 {
            return value;
        }
        if self.count == n {
            self.sum -= f64::from(self.buf[self.index]);
        } else {
            self.count += 1;
        }
        self.buf[self.index] = value;
        self.sum += f64::from(value);
        self.index = (self.index + 1) % n;
        if self.index == 0 {
            // once per lap, drop accumulated rounding error
            self.sum = self.buffered_sum();
        }
        (self.sum / self.count as f64) as f32
    }
}
