// Attitude sensing: per-axis Kalman smoothing, quaternion fusion and the
// MPU6050 register driver.

pub mod fusion;
pub mod kalman;
pub mod mpu6050;

pub use fusion::AttitudeEstimator;
pub use kalman::AxisKalman;
pub use mpu6050::Mpu6050;
