// Loop timing, servo pulse range, body topology and intent limits.

use std::time::Duration;

// Control loop frequency, matched to the PWM frame rate.
pub const LOOP_HZ: u64 = 50;

// Integration step for the attitude fusion, seconds.
pub const TICK_DT: f32 = 1.0 / LOOP_HZ as f32;

// Watchdog: a Move intent older than this is treated as a stop.
pub const CMD_TIMEOUT: Duration = Duration::from_millis(1000);

// Servo pulse range and PWM frame, microseconds.
pub const PULSE_MIN_US: f32 = 500.0;
pub const PULSE_MAX_US: f32 = 2500.0;
pub const PWM_PERIOD_US: f32 = 20_000.0;

// 12-bit duty resolution.
pub const DUTY_MAX: f32 = 4095.0;

// I2C addresses of the two PWM chips (chip A carries channels 0-15).
pub const PCA_ADDR_A: u8 = 0x41;
pub const PCA_ADDR_B: u8 = 0x40;

// MPU6050 address.
pub const IMU_ADDR: u8 = 0x68;

// Leg segment lengths, millimetres.
pub const COXA_LEN: f32 = 33.0;
pub const FEMUR_LEN: f32 = 90.0;
pub const TIBIA_LEN: f32 = 110.0;

// Where each foot sits relative to body centre when standing, mm.
pub const BODY_POINTS: [[f32; 3]; 6] = [
    [137.1, 189.4, 0.0],
    [225.0, 0.0, 0.0],
    [137.1, -189.4, 0.0],
    [-137.1, -189.4, 0.0],
    [-225.0, 0.0, 0.0],
    [-137.1, 189.4, 0.0],
];

// Leg mounting rotation from the body X axis, degrees.
pub const MOUNT_ANGLES: [f32; 6] = [54.0, 0.0, -54.0, -126.0, 180.0, 126.0];

// Distance from body centre to each coxa pivot, mm.
pub const MOUNT_OFFSETS: [f32; 6] = [94.0, 85.0, 94.0, 94.0, 85.0, 94.0];

// Vertical drop from the mounting plate to the coxa axis, mm.
pub const MOUNT_HEIGHT: f32 = 14.0;

// Logical servo channels per leg: [coxa, femur, tibia].
pub const SERVO_CHANNELS: [[u8; 3]; 6] = [
    [15, 14, 13],
    [12, 11, 10],
    [9, 8, 31],
    [22, 23, 27],
    [19, 20, 21],
    [16, 17, 18],
];

// Legs 3-5 are mounted rotated 180 degrees.
pub const MIRRORED: [bool; 6] = [false, false, false, true, true, true];

// Default body height below the coxa plane, mm (negative = feet below body).
pub const BODY_HEIGHT: f32 = -100.0;

// Neutral foot position in the leg-local frame, mm.
pub const NEUTRAL_FOOT: [f32; 3] = [140.0, 0.0, 0.0];

// Swing arc apex above the stance plane, mm.
pub const STEP_HEIGHT: f32 = 40.0;

// Intent limits.
pub const MAX_TRANSLATION_MM: f32 = 35.0;
pub const MAX_ROTATION_DEG: f32 = 15.0;
pub const MIN_SPEED: u8 = 2;
pub const MAX_SPEED: u8 = 10;
pub const MAX_ATTITUDE_DEG: f32 = 15.0;
pub const MAX_BODY_SHIFT_XY_MM: f32 = 40.0;
pub const MAX_BODY_SHIFT_Z_MM: f32 = 20.0;

// Ticks spent in one gait phase at the speed extremes (inverse linear map,
// higher speed = fewer ticks).
pub const TRIPOD_TICKS_SLOW: f32 = 16.0;
pub const TRIPOD_TICKS_FAST: f32 = 3.0;
pub const WAVE_TICKS_SLOW: f32 = 28.0;
pub const WAVE_TICKS_FAST: f32 = 8.0;

// Attitude estimator.
pub const KALMAN_Q: f32 = 0.001;
pub const KALMAN_R: f32 = 0.1;
pub const ACCEL_JUMP_G: f32 = 0.25;
pub const GYRO_JUMP_DPS: f32 = 60.0;
pub const BIAS_SAMPLES: usize = 100;

// Ticks the estimator may coast on a stale reading before stabilization is
// forced off (0.5 s at 50 Hz).
pub const MAX_STALE_TICKS: u32 = 25;

// Consecutive bus timeouts on one chip before the runtime forces relax.
pub const MAX_CHIP_TIMEOUTS: u32 = 3;

// Stabilization PID gains and output clamp.
pub const STAB_KP: f32 = 0.5;
pub const STAB_KI: f32 = 0.01;
pub const STAB_KD: f32 = 0.1;
pub const STAB_INTEGRAL_LIMIT: f32 = 10.0;
pub const STAB_OUTPUT_LIMIT: f32 = 15.0;

// Calibration offsets file, one leg per line.
pub const CALIBRATION_FILE: &str = "calibration.txt";
