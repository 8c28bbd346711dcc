// MPU6050 accelerometer/gyroscope register driver.

use tracing::info;

use crate::error::Result;
use crate::hw::{I2cTransport, ImuSample, InertialSensor};

// Registers.
const PWR_MGMT_1: u8 = 0x6B;
const SMPLRT_DIV: u8 = 0x19;
const CONFIG: u8 = 0x1A;
const GYRO_CONFIG: u8 = 0x1B;
const ACCEL_CONFIG: u8 = 0x1C;
const ACCEL_XOUT_H: u8 = 0x3B;
const GYRO_XOUT_H: u8 = 0x43;

// LSB per g at +/-2g, LSB per deg/s at +/-250 deg/s.
const ACCEL_SCALE: f32 = 16384.0;
const GYRO_SCALE: f32 = 131.0;

pub struct Mpu6050<T: I2cTransport> {
    transport: T,
    address: u8,
}

impl<T: I2cTransport> Mpu6050<T> {
    pub fn new(transport: T, address: u8) -> Self {
        Self { transport, address }
    }

    /// Wake the device and select the +/-2g and +/-250 deg/s ranges.
    pub fn initialize(&mut self) -> Result<()> {
        self.transport.write_reg(self.address, PWR_MGMT_1, 0x00)?;
        self.transport.write_reg(self.address, SMPLRT_DIV, 0x07)?;
        self.transport.write_reg(self.address, CONFIG, 0x00)?;
        self.transport.write_reg(self.address, GYRO_CONFIG, 0x00)?;
        self.transport.write_reg(self.address, ACCEL_CONFIG, 0x00)?;
        info!(address = format_args!("0x{:02x}", self.address), "mpu6050 initialized");
        Ok(())
    }

    fn read_word(&mut self, reg: u8) -> Result<i16> {
        let high = self.transport.read_reg(self.address, reg)?;
        let low = self.transport.read_reg(self.address, reg + 1)?;
        Ok(i16::from_be_bytes([high, low]))
    }
}

impl<T: I2cTransport> InertialSensor for Mpu6050<T> {
    fn read_sample(&mut self) -> Result<ImuSample> {
        let mut accel = [0.0_f32; 3];
        let mut gyro = [0.0_f32; 3];
        for axis in 0..3 {
            accel[axis] = self.read_word(ACCEL_XOUT_H + 2 * axis as u8)? as f32 / ACCEL_SCALE;
            gyro[axis] = self.read_word(GYRO_XOUT_H + 2 * axis as u8)? as f32 / GYRO_SCALE;
        }
        Ok(ImuSample { accel, gyro })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::hw::mock::MockI2c;

    fn load_word(transport: &mut MockI2c, reg: u8, value: i16) {
        let [high, low] = value.to_be_bytes();
        transport.regs.insert((config::IMU_ADDR, reg), high);
        transport.regs.insert((config::IMU_ADDR, reg + 1), low);
    }

    #[test]
    fn initialize_wakes_and_configures() {
        let mut imu = Mpu6050::new(MockI2c::default(), config::IMU_ADDR);
        imu.initialize().unwrap();
        assert_eq!(imu.transport.regs[&(config::IMU_ADDR, PWR_MGMT_1)], 0x00);
        assert_eq!(imu.transport.regs[&(config::IMU_ADDR, SMPLRT_DIV)], 0x07);
        assert_eq!(imu.transport.regs[&(config::IMU_ADDR, GYRO_CONFIG)], 0x00);
    }

    #[test]
    fn sample_scales_raw_words() {
        let mut transport = MockI2c::default();
        // 1 g on Z, half scale; 131 LSB = 1 deg/s on gyro X.
        load_word(&mut transport, ACCEL_XOUT_H + 4, 16384);
        load_word(&mut transport, GYRO_XOUT_H, 131);
        let mut imu = Mpu6050::new(transport, config::IMU_ADDR);
        let sample = imu.read_sample().unwrap();
        assert!((sample.accel[2] - 1.0).abs() < 1e-4);
        assert!((sample.gyro[0] - 1.0).abs() < 1e-4);
        assert_eq!(sample.accel[0], 0.0);
    }

    #[test]
    fn negative_words_sign_extend() {
        let mut transport = MockI2c::default();
        load_word(&mut transport, ACCEL_XOUT_H, -16384);
        let mut imu = Mpu6050::new(transport, config::IMU_ADDR);
        let sample = imu.read_sample().unwrap();
        assert!((sample.accel[0] + 1.0).abs() < 1e-4);
    }
}
