// Error taxonomy for the control core.
//
// Recoverable conditions (unreachable targets, bus timeouts, stale sensors)
// are handled inside the tick loop and surfaced through telemetry; only
// contract violations propagate to the caller.

use crate::hw::ChipId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("logical channel {0} outside 0-31")]
    InvalidChannel(u8),

    #[error("servo angle {0} outside 0-180 degrees")]
    AngleOutOfRange(f32),

    #[error("foot target ({x:.1}, {y:.1}, {z:.1}) outside leg {leg} workspace")]
    UnreachableTarget { leg: u8, x: f32, y: f32, z: f32 },

    #[error("bus transaction to chip {chip:?} timed out")]
    HardwareTimeout { chip: ChipId },

    #[error("calibration file {path}: {reason}")]
    CalibrationLoadFailure { path: String, reason: String },

    #[error("inertial sensor read failed: {0}")]
    SensorReadFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
