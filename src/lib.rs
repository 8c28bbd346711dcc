// Hexapod control core: channel routing, leg kinematics, gait generation,
// attitude estimation and the 50 Hz control loop that ties them to the
// PWM chips.

pub mod body;
pub mod calibration;
pub mod config;
pub mod control;
pub mod error;
pub mod gait;
pub mod hw;
pub mod imu;
pub mod messages;
pub mod runtime;
pub mod servo;

pub use error::{Error, Result};
