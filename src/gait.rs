// Gait generation: discrete-phase tripod and wave patterns.
//
// The engine owns the body-frame foot points and advances them once per
// control tick. Displacement is expressed per tick so a whole cycle walks the
// commanded distance: stance legs drag backward under the body while swing
// legs lift, advance and lower. Rotation intent superimposes each leg's
// attach-point arc around the body centre.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config;
use crate::messages::MoveIntent;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GaitPattern {
    /// Two groups of three legs alternate; fast.
    #[default]
    Tripod,
    /// One leg swings at a time, five planted; slow but stable.
    Wave,
}

impl GaitPattern {
    pub fn phase_count(self) -> u8 {
        match self {
            GaitPattern::Tripod => 8,
            GaitPattern::Wave => 6,
        }
    }
}

/// Visiting order for the wave pattern, chosen so consecutive swing legs are
/// never adjacent.
const WAVE_ORDER: [usize; 6] = [5, 2, 1, 0, 3, 4];

pub struct GaitEngine {
    pattern: GaitPattern,
    phase: u8,
    tick_in_phase: u32,
    ticks_per_phase: u32,
    idle: bool,
    intent: MoveIntent,
    /// Per-tick xy displacement per leg, translation and rotation combined.
    xy: [[f32; 2]; 6],
    /// Per-tick vertical step increment.
    z_inc: f32,
    home: [[f32; 3]; 6],
    points: [[f32; 3]; 6],
}

impl GaitEngine {
    pub fn new() -> Self {
        let home = std::array::from_fn(|i| {
            let bp = config::BODY_POINTS[i];
            [bp[0], bp[1], config::BODY_HEIGHT]
        });
        Self {
            pattern: GaitPattern::default(),
            phase: 0,
            tick_in_phase: 0,
            ticks_per_phase: Self::map_speed(GaitPattern::default(), config::MIN_SPEED),
            idle: true,
            intent: MoveIntent::default(),
            xy: [[0.0; 2]; 6],
            z_inc: 0.0,
            home,
            points: home,
        }
    }

    /// Speed level (2-10) to ticks per phase, inverse linear.
    fn map_speed(pattern: GaitPattern, speed: u8) -> u32 {
        let speed = speed.clamp(config::MIN_SPEED, config::MAX_SPEED) as f32;
        let (slow, fast) = match pattern {
            GaitPattern::Tripod => (config::TRIPOD_TICKS_SLOW, config::TRIPOD_TICKS_FAST),
            GaitPattern::Wave => (config::WAVE_TICKS_SLOW, config::WAVE_TICKS_FAST),
        };
        let span = (config::MAX_SPEED - config::MIN_SPEED) as f32;
        (slow - (speed - config::MIN_SPEED as f32) * (slow - fast) / span).round() as u32
    }

    pub fn ticks_per_phase(&self) -> u32 {
        self.ticks_per_phase
    }

    pub fn pattern(&self) -> GaitPattern {
        self.pattern
    }

    pub fn phase(&self) -> u8 {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Adopt new motion intent. Zero intent on every axis (translation AND
    /// rotation) parks the engine in the idle phase holding the current
    /// stance; anything else (re)starts the cycle.
    pub fn apply_intent(&mut self, intent: MoveIntent) {
        let intent = intent.clamped();

        if intent.is_zero() {
            if !self.idle {
                debug!("gait idle, holding stance");
            }
            self.hold();
            return;
        }

        let restart = self.idle || intent.pattern != self.pattern;
        if restart {
            self.pattern = intent.pattern;
            self.phase = 0;
            self.tick_in_phase = 0;
            self.points = self.home;
            debug!(pattern = ?self.pattern, "gait cycle start");
        }
        self.idle = false;
        self.intent = intent;
        self.ticks_per_phase = Self::map_speed(self.pattern, intent.speed);
        self.recompute_deltas();
    }

    /// Zero the intent and hold the current stance without snapping the feet
    /// back to neutral. Any leg caught mid-swing is set down on the stance
    /// plane, so the held pose is always a planted one.
    pub fn hold(&mut self) {
        self.idle = true;
        self.intent = MoveIntent::default();
        for leg in 0..6 {
            self.points[leg][2] = self.home[leg][2];
        }
    }

    /// Return to the neutral standing stance and hold it.
    pub fn stand(&mut self) {
        self.hold();
        self.points = self.home;
        self.phase = 0;
        self.tick_in_phase = 0;
    }

    fn recompute_deltas(&mut self) {
        let cycle_ticks =
            (self.ticks_per_phase * self.pattern.phase_count() as u32) as f32;
        let rot = self.intent.rotate.to_radians();
        let (sin_r, cos_r) = rot.sin_cos();
        for i in 0..6 {
            let bp = self.home[i];
            self.xy[i] = [
                (bp[0] * cos_r + bp[1] * sin_r - bp[0] + self.intent.x) / cycle_ticks,
                (-bp[0] * sin_r + bp[1] * cos_r - bp[1] + self.intent.y) / cycle_ticks,
            ];
        }
        self.z_inc = config::STEP_HEIGHT / cycle_ticks;
    }

    /// Advance one control tick and return the body-frame foot points.
    pub fn tick(&mut self) -> [[f32; 3]; 6] {
        if self.idle {
            return self.points;
        }

        match self.pattern {
            GaitPattern::Tripod => self.tick_tripod(),
            GaitPattern::Wave => self.tick_wave(),
        }

        self.tick_in_phase += 1;
        if self.tick_in_phase >= self.ticks_per_phase {
            self.tick_in_phase = 0;
            self.phase = (self.phase + 1) % self.pattern.phase_count();
        }
        self.points
    }

    fn drag(&mut self, leg: usize, factor: f32) {
        self.points[leg][0] += factor * self.xy[leg][0];
        self.points[leg][1] += factor * self.xy[leg][1];
    }

    /// Eight phases per cycle. Even legs (0, 2, 4) and odd legs (1, 3, 5)
    /// form the two tripods; while one tripod swings (lift, advance, lower)
    /// the other drags the body forward.
    fn tick_tripod(&mut self) {
        let phase = self.phase;
        for i in 0..3 {
            let even = 2 * i;
            let odd = 2 * i + 1;
            match phase {
                0 => {
                    self.drag(even, -4.0);
                    self.drag(odd, 8.0);
                    self.points[odd][2] = self.home[odd][2] + config::STEP_HEIGHT;
                }
                1 => {
                    self.drag(even, -4.0);
                    self.points[odd][2] -= 8.0 * self.z_inc;
                }
                2 => {
                    self.points[even][2] += 8.0 * self.z_inc;
                    self.drag(odd, -4.0);
                }
                3 | 4 => {
                    self.drag(even, 8.0);
                    self.drag(odd, -4.0);
                }
                5 => {
                    self.points[even][2] -= 8.0 * self.z_inc;
                    self.drag(odd, -4.0);
                }
                6 => {
                    self.drag(even, -4.0);
                    self.points[odd][2] += 8.0 * self.z_inc;
                }
                _ => {
                    self.drag(even, -4.0);
                    self.drag(odd, 8.0);
                }
            }
        }
    }

    /// Six phases per cycle, one swing leg each, visited in WAVE_ORDER. The
    /// swing leg lifts, advances and lowers within its phase; the five
    /// stance legs drag continuously.
    ///
    /// The lift and lower windows are the same length and the advance factor
    /// is scaled to cancel five phases of stance drag exactly, so a foot
    /// lands back on its home point every cycle at any tick count. The last
    /// swing tick pins z to the stance plane to keep float residue out of
    /// the closure.
    fn tick_wave(&mut self) {
        let swing = WAVE_ORDER[self.phase as usize];
        let third = (self.ticks_per_phase / 3).max(1);
        let lower_start = self.ticks_per_phase - third;
        let advance = 10.0 * self.ticks_per_phase as f32 / (lower_start - third) as f32;
        for leg in 0..6 {
            if leg == swing {
                if self.tick_in_phase < third {
                    self.points[leg][2] += 18.0 * self.z_inc;
                } else if self.tick_in_phase < lower_start {
                    self.drag(leg, advance);
                } else if self.tick_in_phase == self.ticks_per_phase - 1 {
                    self.points[leg][2] = self.home[leg][2];
                } else {
                    self.points[leg][2] -= 18.0 * self.z_inc;
                }
            } else {
                self.drag(leg, -2.0);
            }
        }
    }
}

impl Default for GaitEngine {
    fn default() -> Self {
        Self::new()
    }
}
