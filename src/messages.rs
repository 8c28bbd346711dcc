// Command and telemetry contract between the control core and the API layer.
//
// The API layer validates ranges before submitting; the core clamps again so
// a misbehaving caller can never push a servo past its limits.

use serde::{Deserialize, Serialize};

use crate::config;
use crate::gait::GaitPattern;

/// Motion intent: body-frame displacement per gait cycle plus rotation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct MoveIntent {
    /// Lateral displacement, mm per cycle (positive = right).
    pub x: f32,
    /// Forward displacement, mm per cycle (positive = forward).
    pub y: f32,
    /// In-place rotation, degrees per cycle (positive = counter-clockwise).
    pub rotate: f32,
    /// Speed level 2-10.
    pub speed: u8,
    pub pattern: GaitPattern,
}

impl MoveIntent {
    /// Clamp all axes into the ranges the hardware tolerates.
    pub fn clamped(mut self) -> Self {
        self.x = self.x.clamp(-config::MAX_TRANSLATION_MM, config::MAX_TRANSLATION_MM);
        self.y = self.y.clamp(-config::MAX_TRANSLATION_MM, config::MAX_TRANSLATION_MM);
        self.rotate = self
            .rotate
            .clamp(-config::MAX_ROTATION_DEG, config::MAX_ROTATION_DEG);
        self.speed = self.speed.clamp(config::MIN_SPEED, config::MAX_SPEED);
        self
    }

    /// True when every axis is zero. Rotation counts: a rotate-only intent
    /// is motion, not a stop.
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.rotate == 0.0
    }
}

/// Commands accepted by the control loop, at most one applied per tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Move(MoveIntent),
    /// Manual body attitude override, degrees. Bypasses stabilization.
    Attitude { roll: f32, pitch: f32, yaw: f32 },
    /// Shift the body while feet stay planted, mm.
    BodyPose { x: f32, y: f32, z: f32 },
    Stop,
    Relax,
    Resume,
    SetStabilization { enabled: bool },
    /// Set one leg's per-joint calibration offsets, degrees.
    SetCalibration { leg: u8, coxa: f32, femur: f32, tibia: f32 },
    SaveCalibration,
}

/// Health of one PWM chip as seen from the write path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChipHealth {
    #[default]
    Ok,
    /// At least one recent write timed out; retrying.
    Degraded,
    /// Consecutive-timeout limit hit; runtime forced relax.
    Fault,
}

/// Filtered body orientation, degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct AttitudeSnapshot {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// Last joint angles applied to one leg, degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct JointAngles {
    pub coxa: f32,
    pub femur: f32,
    pub tibia: f32,
}

/// Snapshot of the loop state published every tick. Always a copy, never a
/// reference into live state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Telemetry {
    pub attitude: AttitudeSnapshot,
    pub pattern: GaitPattern,
    pub phase: u8,
    pub idle: bool,
    pub joint_angles: [JointAngles; 6],
    pub chip_a: ChipHealth,
    pub chip_b: ChipHealth,
    pub stabilization_enabled: bool,
    /// Set when the attitude estimate is coasting on stale sensor data.
    pub attitude_stale: bool,
    /// Set when calibration could not be loaded and zero offsets are in use.
    pub calibration_warning: bool,
    pub relaxed: bool,
}
