use super::Filter;

/// Initial noise values and adaptation bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanParams {
    pub q: f32,
    pub r: f32,
    pub q_min: f32,
    pub q_max: f32,
    pub r_min: f32,
    pub r_max: f32,
    /// Innovations above this magnitude shift trust to the measurement.
    pub innovation_threshold: f32,
}

impl Default for KalmanParams {
    fn default() -> Self {
        Self {
            q: 0.5,
            r: 1.0,
            q_min: 0.001,
            q_max: 1.0,
            r_min: 0.5,
            r_max: 5.0,
            innovation_threshold: 10.0,
        }
    }
}

/// Scalar Kalman filter whose Q/R retune themselves from the innovation.
///
/// `set_boost` temporarily replaces the process noise used in the predict
/// step; the adaptive Q itself always stays in `[q_min, q_max]`.
#[derive(Debug, Clone)]
pub struct AdaptiveKalman {
    params: KalmanParams,
    x: f32,
    p: f32,
    q: f32,
    r: f32,
    k: f32,
    boost_q: Option<f32>,
}

impl AdaptiveKalman {
    pub fn new(params: KalmanParams) -> Self {
        Self {
            params,
            x: 0.0,
            p: 1.0,
            q: params.q.clamp(params.q_min, params.q_max),
            r: params.r.clamp(params.r_min, params.r_max),
            k: 0.0,
            boost_q: None,
        }
    }

    pub fn estimate(&self) -> f32 {
        self.x
    }

    pub fn gain(&self) -> f32 {
        self.k
    }

    pub fn covariance(&self) -> f32 {
        self.p
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn r(&self) -> f32 {
        self.r
    }

    pub fn params(&self) -> &KalmanParams {
        &self.params
    }

    pub fn boost(&self) -> Option<f32> {
        self.boost_q
    }

    /// Override the predict-step process noise (`None` restores adaptive Q).
    pub fn set_boost(&mut self, q: Option<f32>) {
        self.boost_q = q.filter(|v| v.is_finite() && *v > 0.0);
    }

    /// Set adaptive Q, clamped to its bounds.
    pub fn set_q(&mut self, q: f32) {
        if q.is_finite() {
            self.q = q.clamp(self.params.q_min, self.params.q_max);
        }
    }
}

impl Filter for AdaptiveKalman {
    fn reset(&mut self, seed: f32) {
        self.x = seed;
        self.p = 1.0;
        self.k = 0.0;
        self.q = self.params.q.clamp(self.params.q_min, self.params.q_max);
        self.r = self.params.r.clamp(self.params.r_min, self.params.r_max);
        self.boost_q = None;
    }

    fn update(&mut self, z: f32) -> f32 {
        if !z.is_finite() {
            return self.x;
        }
        // predict
        self.p += self.boost_q.unwrap_or(self.q);
        // update
        let e = z - self.x;
        let denom = self.p + self.r;
        self.k = if denom > 0.0 {
            (self.p / denom).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.x += self.k * e;
        self.p *= 1.0 - self.k;

        let pr = &self.params;
        if e.abs() > pr.innovation_threshold {
            self.q = (self.q * 1.2).min(pr.q_max);
            self.r = (self.r * 0.8).max(pr.r_min);
        } else {
            self.q = (self.q * 0.8).max(pr.q_min);
            self.r = (self.r * 1.2).min(pr.r_max);
        }
        self.x
    }
}
