// Servo output stack: logical channel routing, angle-to-duty mapping and
// the PCA9685 register driver.

pub mod pca9685;
pub mod pulse;
pub mod router;

pub use pca9685::Pca9685;
pub use pulse::{PulseMapper, PwmDuty};
pub use router::{ChannelRouter, Route};
