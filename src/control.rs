// Stabilization: incremental PID per body axis.
//
// The controller turns a measured roll/pitch error into a small opposing
// body-pose correction applied before kinematics solving. The integral term
// is clamped to an anti-windup bound, and disabling the controller resets
// all accumulated state so re-enabling starts from a clean output.

use tracing::debug;

use crate::config;
use crate::messages::AttitudeSnapshot;

#[derive(Debug, Clone)]
pub struct IncrementalPid {
    kp: f32,
    ki: f32,
    kd: f32,
    target: f32,
    integral: f32,
    integral_limit: f32,
    last_error: f32,
}

impl IncrementalPid {
    pub fn new(kp: f32, ki: f32, kd: f32, integral_limit: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            target: 0.0,
            integral: 0.0,
            integral_limit,
            last_error: 0.0,
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn update(&mut self, measured: f32) -> f32 {
        let error = self.target - measured;
        self.integral = (self.integral + error).clamp(-self.integral_limit, self.integral_limit);
        let derivative = error - self.last_error;
        self.last_error = error;
        self.kp * error + self.ki * self.integral + self.kd * derivative
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
    }
}

/// Roll/pitch body-pose correction, degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoseCorrection {
    pub roll: f32,
    pub pitch: f32,
}

pub struct StabilizationController {
    roll: IncrementalPid,
    pitch: IncrementalPid,
    enabled: bool,
    correction: PoseCorrection,
}

impl StabilizationController {
    pub fn new() -> Self {
        let pid = || {
            IncrementalPid::new(
                config::STAB_KP,
                config::STAB_KI,
                config::STAB_KD,
                config::STAB_INTEGRAL_LIMIT,
            )
        };
        Self {
            roll: pid(),
            pitch: pid(),
            enabled: false,
            correction: PoseCorrection::default(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enabling starts from zeroed state; disabling resets it so the next
    /// enable produces no output discontinuity.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.roll.reset();
        self.pitch.reset();
        self.correction = PoseCorrection::default();
        debug!(enabled, "stabilization toggled");
    }

    /// Compute this tick's correction from the measured attitude. Returns
    /// the zero correction while disabled.
    pub fn update(&mut self, attitude: &AttitudeSnapshot) -> PoseCorrection {
        if !self.enabled {
            return PoseCorrection::default();
        }
        self.correction = PoseCorrection {
            roll: self
                .roll
                .update(attitude.roll)
                .clamp(-config::STAB_OUTPUT_LIMIT, config::STAB_OUTPUT_LIMIT),
            pitch: self
                .pitch
                .update(attitude.pitch)
                .clamp(-config::STAB_OUTPUT_LIMIT, config::STAB_OUTPUT_LIMIT),
        };
        self.correction
    }

    pub fn correction(&self) -> PoseCorrection {
        self.correction
    }
}

impl Default for StabilizationController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_respects_anti_windup_bound() {
        let mut pid = IncrementalPid::new(0.5, 0.01, 0.1, 10.0);
        // Constant error sustained far past the bound.
        for _ in 0..10_000 {
            pid.update(-3.0);
        }
        assert!(pid.integral() <= 10.0);
        assert_eq!(pid.integral(), 10.0);

        for _ in 0..10_000 {
            pid.update(3.0);
        }
        assert_eq!(pid.integral(), -10.0);
    }

    #[test]
    fn output_opposes_error() {
        let mut pid = IncrementalPid::new(0.5, 0.01, 0.1, 10.0);
        // Body rolled +4 degrees: correction must be negative.
        let out = pid.update(4.0);
        assert!(out < 0.0);
    }

    #[test]
    fn reenable_starts_from_zero_output() {
        let mut stab = StabilizationController::new();
        stab.set_enabled(true);
        for _ in 0..50 {
            stab.update(&AttitudeSnapshot {
                roll: 5.0,
                pitch: -3.0,
                yaw: 0.0,
            });
        }
        assert_ne!(stab.correction(), PoseCorrection::default());

        stab.set_enabled(false);
        assert_eq!(stab.correction(), PoseCorrection::default());

        stab.set_enabled(true);
        // First tick after re-enable with zero error: no residual output.
        let out = stab.update(&AttitudeSnapshot::default());
        assert_eq!(out, PoseCorrection::default());
    }

    #[test]
    fn disabled_controller_outputs_nothing() {
        let mut stab = StabilizationController::new();
        let out = stab.update(&AttitudeSnapshot {
            roll: 10.0,
            pitch: 10.0,
            yaw: 0.0,
        });
        assert_eq!(out, PoseCorrection::default());
    }

    #[test]
    fn correction_clamped_to_output_limit() {
        let mut stab = StabilizationController::new();
        stab.set_enabled(true);
        let mut out = PoseCorrection::default();
        for _ in 0..100 {
            out = stab.update(&AttitudeSnapshot {
                roll: 90.0,
                pitch: -90.0,
                yaw: 0.0,
            });
        }
        assert_eq!(out.roll, -config::STAB_OUTPUT_LIMIT);
        assert_eq!(out.pitch, config::STAB_OUTPUT_LIMIT);
    }
}
