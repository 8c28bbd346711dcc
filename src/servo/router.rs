// Logical-to-physical servo channel routing.
//
// 32 logical channels span two 16-channel chips: 0-15 on chip A, 16-31 on
// chip B. The table accepts overrides as plain data for boards whose wiring
// departs from that split; routing code never branches on specific
// channels. On this hexapod the cross-side wiring lives in the leg-to-
// channel table, so the physical routing is the plain split.

use crate::error::{Error, Result};
use crate::hw::ChipId;

pub const LOGICAL_CHANNELS: u8 = 32;

/// Resolved destination of one logical channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub chip: ChipId,
    pub channel: u8,
}

pub struct ChannelRouter {
    table: [Route; LOGICAL_CHANNELS as usize],
}

impl ChannelRouter {
    /// Build the naive split: logical n -> (A, n) for n < 16, (B, n - 16)
    /// otherwise.
    pub fn new() -> Self {
        let mut table = [Route {
            chip: ChipId::A,
            channel: 0,
        }; LOGICAL_CHANNELS as usize];
        for (logical, slot) in table.iter_mut().enumerate() {
            *slot = if logical < 16 {
                Route {
                    chip: ChipId::A,
                    channel: logical as u8,
                }
            } else {
                Route {
                    chip: ChipId::B,
                    channel: logical as u8 - 16,
                }
            };
        }
        Self { table }
    }

    /// Replace individual table entries with measured wiring.
    pub fn with_overrides(mut self, overrides: &[(u8, Route)]) -> Self {
        for &(logical, route) in overrides {
            self.table[logical as usize] = route;
        }
        self
    }

    /// The wiring of this hexapod. The two tibia channels that sit apart
    /// from their leg's block (27 and 31) are pinned here as measured
    /// wiring; both coincide with the plain split.
    pub fn hexapod() -> Self {
        Self::new().with_overrides(&[
            (
                31,
                Route {
                    chip: ChipId::B,
                    channel: 15,
                },
            ),
            (
                27,
                Route {
                    chip: ChipId::B,
                    channel: 11,
                },
            ),
        ])
    }

    pub fn route(&self, logical: u8) -> Result<Route> {
        if logical >= LOGICAL_CHANNELS {
            return Err(Error::InvalidChannel(logical));
        }
        Ok(self.table[logical as usize])
    }
}

impl Default for ChannelRouter {
    fn default() -> Self {
        Self::hexapod()
    }
}
