// PCA9685 16-channel PWM controller driver.
//
// Register protocol over the byte transport: MODE1 reset, prescale
// programming with the sleep/restart dance, then four LEDn register writes
// per channel update. Both chips run at the 50 Hz servo frame.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;
use crate::hw::{ChipId, I2cTransport, PwmChip};
use crate::servo::pulse::PwmDuty;

// Internal oscillator, Hz.
const OSC_CLOCK: f32 = 25_000_000.0;
const RESOLUTION: f32 = 4096.0;

// Registers.
const MODE1: u8 = 0x00;
const PRESCALE: u8 = 0xFE;
const LED0_ON_L: u8 = 0x06;
const ALL_LED_ON_L: u8 = 0xFA;

// MODE1 bits.
const RESTART: u8 = 0x80;
const SLEEP: u8 = 0x10;

pub struct Pca9685<T: I2cTransport> {
    transport: T,
    address: u8,
    chip: ChipId,
}

impl<T: I2cTransport> Pca9685<T> {
    pub fn new(transport: T, address: u8, chip: ChipId) -> Self {
        Self {
            transport,
            address,
            chip,
        }
    }

    /// Reset the chip and program the PWM frame rate.
    pub fn initialize(&mut self, frequency_hz: u32) -> Result<()> {
        self.transport.write_reg(self.address, MODE1, 0x00)?;
        self.set_frequency(frequency_hz)?;
        info!(chip = ?self.chip, address = format_args!("0x{:02x}", self.address),
              frequency_hz, "pca9685 initialized");
        Ok(())
    }

    fn set_frequency(&mut self, frequency_hz: u32) -> Result<()> {
        let prescale = (OSC_CLOCK / RESOLUTION / frequency_hz as f32 - 1.0).round() as u8;

        let old_mode = self.transport.read_reg(self.address, MODE1)?;
        // Prescale is only writable while the oscillator sleeps.
        self.transport
            .write_reg(self.address, MODE1, (old_mode & 0x7F) | SLEEP)?;
        self.transport.write_reg(self.address, PRESCALE, prescale)?;
        self.transport.write_reg(self.address, MODE1, old_mode)?;
        std::thread::sleep(Duration::from_millis(5));
        self.transport
            .write_reg(self.address, MODE1, old_mode | RESTART)?;
        Ok(())
    }

    fn write_channel(&mut self, base: u8, duty: PwmDuty) -> Result<()> {
        self.transport
            .write_reg(self.address, base, (duty.on & 0xFF) as u8)?;
        self.transport
            .write_reg(self.address, base + 1, (duty.on >> 8) as u8)?;
        self.transport
            .write_reg(self.address, base + 2, (duty.off & 0xFF) as u8)?;
        self.transport
            .write_reg(self.address, base + 3, (duty.off >> 8) as u8)?;
        Ok(())
    }
}

impl<T: I2cTransport> PwmChip for Pca9685<T> {
    fn set_duty(&mut self, channel: u8, duty: PwmDuty) -> Result<()> {
        debug!(chip = ?self.chip, channel, on = duty.on, off = duty.off, "set duty");
        self.write_channel(LED0_ON_L + 4 * channel, duty)
    }

    fn set_all(&mut self, duty: PwmDuty) -> Result<()> {
        debug!(chip = ?self.chip, on = duty.on, off = duty.off, "set all channels");
        self.write_channel(ALL_LED_ON_L, duty)
    }
}
