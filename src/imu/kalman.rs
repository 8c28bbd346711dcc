// Scalar Kalman filter, one instance per sensor axis.
//
// Q and R are fixed at construction. A genuine step change (a bump) would
// leave the plain recursion lagging for many ticks, so measurements that jump
// past the threshold bypass the prior in favour of a 40/60 blend with the
// previous estimate.

#[derive(Debug, Clone)]
pub struct AxisKalman {
    q: f32,
    r: f32,
    p: f32,
    estimate: f32,
    jump_threshold: f32,
    primed: bool,
}

impl AxisKalman {
    pub fn new(q: f32, r: f32, jump_threshold: f32) -> Self {
        Self {
            q,
            r,
            p: 1.0,
            estimate: 0.0,
            jump_threshold,
            primed: false,
        }
    }

    pub fn estimate(&self) -> f32 {
        self.estimate
    }

    pub fn update(&mut self, measurement: f32) -> f32 {
        if !self.primed {
            self.primed = true;
            self.estimate = measurement;
            return measurement;
        }

        let prior = if (measurement - self.estimate).abs() >= self.jump_threshold {
            measurement * 0.4 + self.estimate * 0.6
        } else {
            self.estimate
        };

        self.p += self.q;
        let k = self.p / (self.p + self.r);
        let filtered = prior + k * (measurement - self.estimate);
        self.p *= 1.0 - k;
        self.estimate = filtered;
        filtered
    }

    pub fn reset(&mut self) {
        self.p = 1.0;
        self.estimate = 0.0;
        self.primed = false;
    }
}
