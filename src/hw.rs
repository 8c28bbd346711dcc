// Hardware boundary traits.
//
// The core never touches /dev directly; it talks to two PWM controller
// chips, one inertial sensor and a servo power switch through these traits.
// Register-level drivers (PCA9685, MPU6050) sit on top of `I2cTransport`.
// Mock implementations live in `hw::mock` and back both the test suite and
// the `--mock` runtime mode.

use crate::error::Result;
use crate::servo::pulse::PwmDuty;

/// Identity of one of the two PWM controller chips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ChipId {
    /// Chip at 0x41, logical channels 0-15.
    A,
    /// Chip at 0x40, logical channels 16-31.
    B,
}

/// One raw inertial reading: acceleration in g, angular rate in deg/s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImuSample {
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
}

/// Byte-register transport to a device on the bus.
pub trait I2cTransport: Send {
    fn write_reg(&mut self, addr: u8, reg: u8, value: u8) -> Result<()>;
    fn read_reg(&mut self, addr: u8, reg: u8) -> Result<u8>;
}

/// A 16-channel PWM controller.
pub trait PwmChip: Send {
    fn set_duty(&mut self, channel: u8, duty: PwmDuty) -> Result<()>;
    fn set_all(&mut self, duty: PwmDuty) -> Result<()>;
}

/// Inertial sensor exposing one combined accel/gyro sample per read.
pub trait InertialSensor: Send {
    fn read_sample(&mut self) -> Result<ImuSample>;
}

/// Servo bus power enable line.
pub trait PowerSwitch: Send {
    fn set_powered(&mut self, on: bool);
    fn is_powered(&self) -> bool;
}

pub mod mock {
    //! In-memory stand-ins used by tests and `--mock` mode.

    use super::*;
    use crate::error::Error;

    /// Records the last duty written to every channel.
    #[derive(Default)]
    pub struct MockPwm {
        pub chip: Option<ChipId>,
        pub last_duty: [Option<PwmDuty>; 16],
        pub write_count: usize,
        /// When set, the next `fail_for` writes report a timeout.
        pub fail_for: usize,
    }

    impl MockPwm {
        pub fn new(chip: ChipId) -> Self {
            Self {
                chip: Some(chip),
                ..Self::default()
            }
        }
    }

    impl PwmChip for MockPwm {
        fn set_duty(&mut self, channel: u8, duty: PwmDuty) -> Result<()> {
            if self.fail_for > 0 {
                self.fail_for -= 1;
                return Err(Error::HardwareTimeout {
                    chip: self.chip.unwrap_or(ChipId::A),
                });
            }
            self.last_duty[channel as usize] = Some(duty);
            self.write_count += 1;
            Ok(())
        }

        fn set_all(&mut self, duty: PwmDuty) -> Result<()> {
            if self.fail_for > 0 {
                self.fail_for -= 1;
                return Err(Error::HardwareTimeout {
                    chip: self.chip.unwrap_or(ChipId::A),
                });
            }
            self.last_duty = [Some(duty); 16];
            self.write_count += 1;
            Ok(())
        }
    }

    /// Cloneable handle around a `MockPwm`, so a test can hand the chip to
    /// the runtime and still inspect what was written.
    #[derive(Clone)]
    pub struct SharedPwm(pub std::sync::Arc<std::sync::Mutex<MockPwm>>);

    impl SharedPwm {
        pub fn new(chip: ChipId) -> Self {
            Self(std::sync::Arc::new(std::sync::Mutex::new(MockPwm::new(
                chip,
            ))))
        }

        pub fn lock(&self) -> std::sync::MutexGuard<'_, MockPwm> {
            self.0.lock().unwrap()
        }
    }

    impl PwmChip for SharedPwm {
        fn set_duty(&mut self, channel: u8, duty: PwmDuty) -> Result<()> {
            self.lock().set_duty(channel, duty)
        }

        fn set_all(&mut self, duty: PwmDuty) -> Result<()> {
            self.lock().set_all(duty)
        }
    }

    /// Replays a fixed sample, optionally failing a number of reads first.
    pub struct MockImu {
        pub sample: ImuSample,
        pub fail_for: usize,
    }

    impl MockImu {
        /// Level sensor at rest: gravity on +Z, no rotation.
        pub fn level() -> Self {
            Self {
                sample: ImuSample {
                    accel: [0.0, 0.0, 1.0],
                    gyro: [0.0, 0.0, 0.0],
                },
                fail_for: 0,
            }
        }
    }

    impl InertialSensor for MockImu {
        fn read_sample(&mut self) -> Result<ImuSample> {
            if self.fail_for > 0 {
                self.fail_for -= 1;
                return Err(Error::SensorReadFailure("mock read failure".into()));
            }
            Ok(self.sample)
        }
    }

    #[derive(Default)]
    pub struct MockPower {
        powered: bool,
    }

    impl PowerSwitch for MockPower {
        fn set_powered(&mut self, on: bool) {
            self.powered = on;
        }

        fn is_powered(&self) -> bool {
            self.powered
        }
    }

    /// Register map backed by a HashMap, for driver-level tests.
    #[derive(Default)]
    pub struct MockI2c {
        pub regs: std::collections::HashMap<(u8, u8), u8>,
        pub writes: Vec<(u8, u8, u8)>,
    }

    impl I2cTransport for MockI2c {
        fn write_reg(&mut self, addr: u8, reg: u8, value: u8) -> Result<()> {
            self.regs.insert((addr, reg), value);
            self.writes.push((addr, reg, value));
            Ok(())
        }

        fn read_reg(&mut self, addr: u8, reg: u8) -> Result<u8> {
            Ok(*self.regs.get(&(addr, reg)).unwrap_or(&0))
        }
    }
}
