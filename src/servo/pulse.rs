// Joint angle to PWM duty conversion.
//
// Two-stage linear map: degrees -> pulse microseconds -> 12-bit duty count.
// The servo-off sentinel is the PCA9685 full-off bit, which no angle can
// produce, so "channel disabled" and "duty zero" stay distinguishable.

use crate::config;
use crate::error::{Error, Result};

/// PCA9685 OFF-register full-off bit (bit 4 of LEDn_OFF_H).
const FULL_OFF: u16 = 0x1000;

/// One channel's on/off register pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmDuty {
    pub on: u16,
    pub off: u16,
}

impl PwmDuty {
    pub fn is_disable(&self) -> bool {
        self.off & FULL_OFF != 0
    }
}

/// Converts angles to duty values for one servo model.
#[derive(Debug, Clone, Copy)]
pub struct PulseMapper {
    pulse_min_us: f32,
    pulse_max_us: f32,
    period_us: f32,
    duty_max: f32,
}

impl Default for PulseMapper {
    fn default() -> Self {
        Self {
            pulse_min_us: config::PULSE_MIN_US,
            pulse_max_us: config::PULSE_MAX_US,
            period_us: config::PWM_PERIOD_US,
            duty_max: config::DUTY_MAX,
        }
    }
}

impl PulseMapper {
    pub fn angle_to_pulse_us(&self, angle: f32) -> Result<f32> {
        if !(0.0..=180.0).contains(&angle) {
            return Err(Error::AngleOutOfRange(angle));
        }
        Ok(self.pulse_min_us + angle / 180.0 * (self.pulse_max_us - self.pulse_min_us))
    }

    /// Map an angle in 0-180 degrees to the duty register pair.
    pub fn angle_to_duty(&self, angle: f32) -> Result<PwmDuty> {
        let pulse_us = self.angle_to_pulse_us(angle)?;
        let off = (pulse_us / self.period_us * self.duty_max).round() as u16;
        Ok(PwmDuty { on: 0, off })
    }

    /// The dedicated servo-off sentinel.
    pub fn disable(&self) -> PwmDuty {
        PwmDuty {
            on: 0,
            off: FULL_OFF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duty_of(us: f32) -> u16 {
        (us / 20_000.0 * 4095.0).round() as u16
    }

    #[test]
    fn endpoints_and_midpoint() {
        let mapper = PulseMapper::default();
        assert_eq!(mapper.angle_to_duty(0.0).unwrap().off, duty_of(500.0));
        assert_eq!(mapper.angle_to_duty(90.0).unwrap().off, duty_of(1500.0));
        assert_eq!(mapper.angle_to_duty(180.0).unwrap().off, duty_of(2500.0));
    }

    #[test]
    fn monotonically_increasing() {
        let mapper = PulseMapper::default();
        let mut last = 0;
        for deg in 0..=180 {
            let duty = mapper.angle_to_duty(deg as f32).unwrap().off;
            assert!(duty >= last, "duty decreased at {deg} degrees");
            last = duty;
        }
    }

    #[test]
    fn rejects_out_of_range() {
        let mapper = PulseMapper::default();
        assert!(matches!(
            mapper.angle_to_duty(-0.1),
            Err(Error::AngleOutOfRange(_))
        ));
        assert!(matches!(
            mapper.angle_to_duty(180.1),
            Err(Error::AngleOutOfRange(_))
        ));
    }

    #[test]
    fn disable_sentinel_distinct_from_zero_duty() {
        let mapper = PulseMapper::default();
        let sentinel = mapper.disable();
        assert!(sentinel.is_disable());
        // No angle produces the full-off bit.
        for deg in 0..=180 {
            assert!(!mapper.angle_to_duty(deg as f32).unwrap().is_disable());
        }
        assert_ne!(sentinel, PwmDuty { on: 0, off: 0 });
    }
}
