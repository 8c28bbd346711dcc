// Attitude estimation: per-axis Kalman smoothing feeding a Mahony-style
// quaternion fusion of accelerometer tilt and integrated gyroscope rate.
//
// The estimator must be bias-calibrated once while stationary before the
// first `update`. On sensor read failures the runtime calls `coast`, which
// holds the last estimate for a bounded number of ticks before reporting the
// estimate unusable.

use tracing::{info, warn};

use crate::config;
use crate::hw::ImuSample;
use crate::imu::kalman::AxisKalman;
use crate::messages::AttitudeSnapshot;

// Mahony feedback gains.
const FUSION_KP: f32 = 2.0;
const FUSION_KI: f32 = 0.005;

#[derive(Default)]
struct BiasAccumulator {
    sum: [f32; 3],
    count: usize,
}

pub struct AttitudeEstimator {
    accel: [AxisKalman; 3],
    gyro: [AxisKalman; 3],
    bias: [f32; 3],
    calibration: Option<BiasAccumulator>,
    /// Orientation quaternion [w, x, y, z], body relative to level.
    quat: [f32; 4],
    integral_fb: [f32; 3],
    attitude: AttitudeSnapshot,
    stale_ticks: u32,
    dt: f32,
}

impl AttitudeEstimator {
    pub fn new() -> Self {
        Self {
            accel: std::array::from_fn(|_| {
                AxisKalman::new(config::KALMAN_Q, config::KALMAN_R, config::ACCEL_JUMP_G)
            }),
            gyro: std::array::from_fn(|_| {
                AxisKalman::new(config::KALMAN_Q, config::KALMAN_R, config::GYRO_JUMP_DPS)
            }),
            bias: [0.0; 3],
            calibration: Some(BiasAccumulator::default()),
            quat: [1.0, 0.0, 0.0, 0.0],
            integral_fb: [0.0; 3],
            attitude: AttitudeSnapshot::default(),
            stale_ticks: 0,
            dt: config::TICK_DT,
        }
    }

    pub fn calibrated(&self) -> bool {
        self.calibration.is_none()
    }

    pub fn gyro_bias(&self) -> [f32; 3] {
        self.bias
    }

    /// Accumulate one stationary sample toward the zero-rate offset.
    /// Returns true once calibration is complete.
    pub fn feed_calibration(&mut self, sample: &ImuSample) -> bool {
        let Some(acc) = self.calibration.as_mut() else {
            return true;
        };
        for axis in 0..3 {
            acc.sum[axis] += sample.gyro[axis];
        }
        acc.count += 1;
        if acc.count < config::BIAS_SAMPLES {
            return false;
        }
        let count = acc.count as f32;
        self.bias = [
            acc.sum[0] / count,
            acc.sum[1] / count,
            acc.sum[2] / count,
        ];
        self.calibration = None;
        info!(bias = ?self.bias, samples = config::BIAS_SAMPLES, "gyro bias calibrated");
        true
    }

    /// Fuse one sensor sample into the attitude estimate.
    pub fn update(&mut self, sample: &ImuSample) -> AttitudeSnapshot {
        self.stale_ticks = 0;

        let ax = self.accel[0].update(sample.accel[0]);
        let ay = self.accel[1].update(sample.accel[1]);
        let az = self.accel[2].update(sample.accel[2]);

        let mut rate = [0.0_f32; 3];
        for axis in 0..3 {
            rate[axis] =
                (self.gyro[axis].update(sample.gyro[axis]) - self.bias[axis]).to_radians();
        }

        self.fuse(ax, ay, az, rate);
        self.attitude = self.euler();
        self.attitude
    }

    fn fuse(&mut self, ax: f32, ay: f32, az: f32, mut rate: [f32; 3]) {
        let [w, x, y, z] = self.quat;

        let norm = (ax * ax + ay * ay + az * az).sqrt();
        if norm > 1e-6 {
            let (ax, ay, az) = (ax / norm, ay / norm, az / norm);

            // Estimated gravity direction in the body frame.
            let vx = 2.0 * (x * z - w * y);
            let vy = 2.0 * (w * x + y * z);
            let vz = w * w - x * x - y * y + z * z;

            // Error is the cross product between measured and estimated
            // gravity.
            let ex = ay * vz - az * vy;
            let ey = az * vx - ax * vz;
            let ez = ax * vy - ay * vx;

            self.integral_fb[0] += FUSION_KI * ex * self.dt;
            self.integral_fb[1] += FUSION_KI * ey * self.dt;
            self.integral_fb[2] += FUSION_KI * ez * self.dt;

            rate[0] += FUSION_KP * ex + self.integral_fb[0];
            rate[1] += FUSION_KP * ey + self.integral_fb[1];
            rate[2] += FUSION_KP * ez + self.integral_fb[2];
        }

        let half_dt = 0.5 * self.dt;
        let [gx, gy, gz] = rate;
        let qw = w + (-x * gx - y * gy - z * gz) * half_dt;
        let qx = x + (w * gx + y * gz - z * gy) * half_dt;
        let qy = y + (w * gy - x * gz + z * gx) * half_dt;
        let qz = z + (w * gz + x * gy - y * gx) * half_dt;

        let norm = (qw * qw + qx * qx + qy * qy + qz * qz).sqrt();
        self.quat = [qw / norm, qx / norm, qy / norm, qz / norm];
    }

    fn euler(&self) -> AttitudeSnapshot {
        let [w, x, y, z] = self.quat;
        let roll = (2.0 * (w * x + y * z))
            .atan2(1.0 - 2.0 * (x * x + y * y))
            .to_degrees();
        let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin().to_degrees();
        let yaw = (2.0 * (w * z + x * y))
            .atan2(1.0 - 2.0 * (y * y + z * z))
            .to_degrees();
        AttitudeSnapshot { roll, pitch, yaw }
    }

    pub fn attitude(&self) -> AttitudeSnapshot {
        self.attitude
    }

    pub fn is_stale(&self) -> bool {
        self.stale_ticks > 0
    }

    /// Hold the last estimate through a failed sensor read. Returns false
    /// once the estimate has been stale too long to act on.
    pub fn coast(&mut self) -> bool {
        self.stale_ticks = self.stale_ticks.saturating_add(1);
        if self.stale_ticks == config::MAX_STALE_TICKS {
            warn!(
                ticks = self.stale_ticks,
                "attitude estimate stale, stabilization must stop"
            );
        }
        self.stale_ticks < config::MAX_STALE_TICKS
    }
}

impl Default for AttitudeEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrated_estimator() -> AttitudeEstimator {
        let mut est = AttitudeEstimator::new();
        let still = ImuSample {
            accel: [0.0, 0.0, 1.0],
            gyro: [0.0, 0.0, 0.0],
        };
        while !est.feed_calibration(&still) {}
        est
    }

    #[test]
    fn bias_calibration_averages_fixed_sample_count() {
        let mut est = AttitudeEstimator::new();
        let drifting = ImuSample {
            accel: [0.0, 0.0, 1.0],
            gyro: [1.0, -2.0, 0.5],
        };
        let mut fed = 0;
        while !est.feed_calibration(&drifting) {
            fed += 1;
        }
        assert_eq!(fed + 1, config::BIAS_SAMPLES);
        assert!(est.calibrated());
        let bias = est.gyro_bias();
        assert!((bias[0] - 1.0).abs() < 1e-3);
        assert!((bias[1] + 2.0).abs() < 1e-3);
        assert!((bias[2] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn level_sensor_settles_level() {
        let mut est = calibrated_estimator();
        let level = ImuSample {
            accel: [0.0, 0.0, 1.0],
            gyro: [0.0, 0.0, 0.0],
        };
        let mut attitude = AttitudeSnapshot::default();
        for _ in 0..300 {
            attitude = est.update(&level);
        }
        assert!(attitude.roll.abs() < 0.5, "roll {}", attitude.roll);
        assert!(attitude.pitch.abs() < 0.5, "pitch {}", attitude.pitch);
    }

    #[test]
    fn static_tilt_converges_to_accel_tilt() {
        let mut est = calibrated_estimator();
        let tilt = 10.0_f32.to_radians();
        let tilted = ImuSample {
            accel: [0.0, tilt.sin(), tilt.cos()],
            gyro: [0.0, 0.0, 0.0],
        };
        let mut attitude = AttitudeSnapshot::default();
        for _ in 0..1500 {
            attitude = est.update(&tilted);
        }
        assert!(
            (attitude.roll - 10.0).abs() < 1.0,
            "roll {} expected ~10",
            attitude.roll
        );
        assert!(attitude.pitch.abs() < 1.0, "pitch {}", attitude.pitch);
    }

    #[test]
    fn coast_bounds_stale_estimate() {
        let mut est = calibrated_estimator();
        est.update(&ImuSample {
            accel: [0.0, 0.0, 1.0],
            gyro: [0.0, 0.0, 0.0],
        });
        assert!(!est.is_stale());
        for _ in 0..config::MAX_STALE_TICKS - 1 {
            assert!(est.coast(), "gave up before the stale bound");
        }
        assert!(!est.coast(), "kept going past the stale bound");
        assert!(est.is_stale());
    }

    #[test]
    fn update_clears_staleness() {
        let mut est = calibrated_estimator();
        est.coast();
        assert!(est.is_stale());
        est.update(&ImuSample {
            accel: [0.0, 0.0, 1.0],
            gyro: [0.0, 0.0, 0.0],
        });
        assert!(!est.is_stale());
    }
}
