// 50 Hz control loop.
//
// One task owns all mutable state and the hardware handles. Commands arrive
// through an mpsc mailbox and at most one is applied per tick, so a tick
// always runs against a consistent intent snapshot; telemetry goes out
// through a watch channel as value copies. A stale-intent watchdog holds the
// stance if the commanding side goes quiet.
//
// Tick order: sensor read -> attitude estimate -> stabilization -> gait ->
// per-leg kinematics -> pulse mapping -> channel routing -> chip writes.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::watch;
use tokio::time::{interval, Instant};
use tracing::{error, info, warn};

use crate::body::{LegGeometry, LegKinematics};
use crate::calibration;
use crate::config;
use crate::control::{PoseCorrection, StabilizationController};
use crate::error::Error;
use crate::gait::GaitEngine;
use crate::hw::{ChipId, InertialSensor, PowerSwitch, PwmChip};
use crate::imu::AttitudeEstimator;
use crate::messages::{AttitudeSnapshot, ChipHealth, Command, JointAngles, Telemetry};
use crate::servo::{ChannelRouter, PulseMapper, PwmDuty};

/// The four hardware handles the loop drives.
pub struct Hardware {
    pub chip_a: Box<dyn PwmChip>,
    pub chip_b: Box<dyn PwmChip>,
    pub imu: Box<dyn InertialSensor>,
    pub power: Box<dyn PowerSwitch>,
}

pub struct Runtime {
    hw: Hardware,
    legs: [LegGeometry; 6],
    solvers: [LegKinematics; 6],
    router: ChannelRouter,
    mapper: PulseMapper,
    gait: GaitEngine,
    estimator: AttitudeEstimator,
    stabilization: StabilizationController,
    /// Manual attitude override, degrees, on top of stabilization.
    attitude_target: AttitudeSnapshot,
    /// Body translation while feet stay planted, mm.
    body_shift: [f32; 3],
    intent_received_at: Instant,
    relaxed: bool,
    timeouts: [u32; 2],
    health: [ChipHealth; 2],
    last_joint_angles: [JointAngles; 6],
    calibration_path: PathBuf,
    calibration_warning: bool,
    telemetry_tx: watch::Sender<Telemetry>,
}

fn chip_index(chip: ChipId) -> usize {
    match chip {
        ChipId::A => 0,
        ChipId::B => 1,
    }
}

impl Runtime {
    pub fn new(hw: Hardware, calibration_path: PathBuf) -> (Self, watch::Receiver<Telemetry>) {
        let (offsets, calibration_warning) = calibration::load_or_default(&calibration_path);
        let mut legs = LegGeometry::hexapod();
        for (leg, row) in legs.iter_mut().zip(offsets) {
            leg.calibration = row;
        }
        let solvers = std::array::from_fn(|i| LegKinematics::for_leg(&legs[i]));
        let (telemetry_tx, telemetry_rx) = watch::channel(Telemetry::default());

        let runtime = Self {
            hw,
            legs,
            solvers,
            router: ChannelRouter::hexapod(),
            mapper: PulseMapper::default(),
            gait: GaitEngine::new(),
            estimator: AttitudeEstimator::new(),
            stabilization: StabilizationController::new(),
            attitude_target: AttitudeSnapshot::default(),
            body_shift: [0.0; 3],
            intent_received_at: Instant::now(),
            relaxed: false,
            timeouts: [0; 2],
            health: [ChipHealth::Ok; 2],
            last_joint_angles: [JointAngles::default(); 6],
            calibration_path,
            calibration_warning,
            telemetry_tx,
        };
        (runtime, telemetry_rx)
    }

    /// Power the servo bus and take the neutral standing stance.
    pub fn startup(&mut self) {
        self.hw.power.set_powered(true);
        let points = self.gait.tick();
        let posed = self.pose_points(points, PoseCorrection::default());
        self.apply_pose(posed);
        info!("servo bus powered, standing at neutral stance");
    }

    /// Apply one command. The loop calls this at most once per tick.
    pub fn on_command(&mut self, cmd: Command) {
        info!(?cmd, "command");
        match cmd {
            Command::Move(intent) => {
                if self.relaxed {
                    warn!("move ignored while relaxed, send resume first");
                    return;
                }
                self.gait.apply_intent(intent);
                self.intent_received_at = Instant::now();
            }
            Command::Attitude { roll, pitch, yaw } => {
                let m = config::MAX_ATTITUDE_DEG;
                self.attitude_target = AttitudeSnapshot {
                    roll: roll.clamp(-m, m),
                    pitch: pitch.clamp(-m, m),
                    yaw: yaw.clamp(-m, m),
                };
            }
            Command::BodyPose { x, y, z } => {
                let xy = config::MAX_BODY_SHIFT_XY_MM;
                let zm = config::MAX_BODY_SHIFT_Z_MM;
                self.body_shift = [x.clamp(-xy, xy), y.clamp(-xy, xy), z.clamp(-zm, zm)];
            }
            Command::Stop => {
                self.gait.hold();
                self.intent_received_at = Instant::now();
            }
            Command::Relax => self.relax(),
            Command::Resume => self.resume(),
            Command::SetStabilization { enabled } => {
                if enabled && self.estimator.is_stale() {
                    warn!("stabilization requested with stale attitude, refusing");
                    return;
                }
                self.stabilization.set_enabled(enabled);
            }
            Command::SetCalibration {
                leg,
                coxa,
                femur,
                tibia,
            } => {
                let Some(geometry) = self.legs.get_mut(leg as usize) else {
                    warn!(leg, "calibration for unknown leg ignored");
                    return;
                };
                geometry.calibration = [coxa, femur, tibia];
            }
            Command::SaveCalibration => {
                let offsets: calibration::Offsets =
                    std::array::from_fn(|i| self.legs[i].calibration);
                if let Err(e) = calibration::save(&self.calibration_path, &offsets) {
                    error!(error = %e, "calibration save failed");
                }
            }
        }
    }

    /// One control tick.
    pub fn tick_once(&mut self) {
        match self.hw.imu.read_sample() {
            Ok(sample) => {
                if !self.estimator.calibrated() {
                    self.estimator.feed_calibration(&sample);
                    self.publish_telemetry();
                    return;
                }
                self.estimator.update(&sample);
            }
            Err(e) => {
                warn!(error = %e, "sensor read failed");
                if !self.estimator.coast() && self.stabilization.enabled() {
                    self.stabilization.set_enabled(false);
                }
            }
        }

        // Intent watchdog: a quiet commanding side means hold, not walk.
        if !self.gait.is_idle() && self.intent_received_at.elapsed() > config::CMD_TIMEOUT {
            warn!("move intent stale, holding stance");
            self.gait.hold();
        }

        if self.relaxed {
            self.publish_telemetry();
            return;
        }

        let correction = self.stabilization.update(&self.estimator.attitude());
        let points = self.gait.tick();
        let posed = self.pose_points(points, correction);
        self.apply_pose(posed);
        self.publish_telemetry();
    }

    /// Superimpose the manual attitude target, the stabilization correction
    /// and the body shift onto the gait's foot points.
    fn pose_points(&self, points: [[f32; 3]; 6], correction: PoseCorrection) -> [[f32; 3]; 6] {
        let m = config::MAX_ATTITUDE_DEG;
        let roll = (self.attitude_target.roll + correction.roll).clamp(-m, m).to_radians();
        let pitch = (self.attitude_target.pitch + correction.pitch)
            .clamp(-m, m)
            .to_radians();
        let yaw = self.attitude_target.yaw.to_radians();
        let (sin_yaw, cos_yaw) = yaw.sin_cos();
        let [sx, sy, sz] = self.body_shift;

        std::array::from_fn(|i| {
            let [px, py, pz] = points[i];
            [
                sx + px * cos_yaw - py * sin_yaw,
                sy + px * sin_yaw + py * cos_yaw,
                pz + sz + px * pitch.sin() + py * roll.sin(),
            ]
        })
    }

    /// Solve, map and write every joint. A failed joint is skipped for this
    /// tick; a timed-out chip is skipped for the rest of the tick.
    fn apply_pose(&mut self, points: [[f32; 3]; 6]) {
        let mut writes: Vec<(ChipId, u8, PwmDuty)> = Vec::with_capacity(18);

        for (i, leg) in self.legs.iter().enumerate() {
            let local = leg.body_to_local(points[i]);
            let solved = match self.solvers[i].solve_clamped(local) {
                Ok(solved) => solved,
                Err(e) => {
                    warn!(leg = leg.id, error = %e, "leg skipped this tick");
                    continue;
                }
            };
            let servo = LegKinematics::servo_angles(&solved, leg);
            self.last_joint_angles[i] = JointAngles {
                coxa: servo[0],
                femur: servo[1],
                tibia: servo[2],
            };

            for joint in 0..3 {
                let duty = match self.mapper.angle_to_duty(servo[joint]) {
                    Ok(duty) => duty,
                    Err(e) => {
                        warn!(leg = leg.id, joint, error = %e, "joint skipped this tick");
                        continue;
                    }
                };
                match self.router.route(leg.channels[joint]) {
                    Ok(route) => writes.push((route.chip, route.channel, duty)),
                    Err(e) => warn!(leg = leg.id, joint, error = %e, "joint skipped this tick"),
                }
            }
        }

        self.flush(&writes);
    }

    fn flush(&mut self, writes: &[(ChipId, u8, PwmDuty)]) {
        let mut skip = [false; 2];
        let mut fault = false;

        for &(chip, channel, duty) in writes {
            let idx = chip_index(chip);
            if skip[idx] || self.health[idx] == ChipHealth::Fault {
                continue;
            }
            let device = match chip {
                ChipId::A => self.hw.chip_a.as_mut(),
                ChipId::B => self.hw.chip_b.as_mut(),
            };
            match device.set_duty(channel, duty) {
                Ok(()) => {
                    self.timeouts[idx] = 0;
                    self.health[idx] = ChipHealth::Ok;
                }
                Err(Error::HardwareTimeout { .. }) => {
                    // Retry next tick; the rest of this tick's writes to the
                    // chip would block behind the same stuck transaction.
                    skip[idx] = true;
                    self.timeouts[idx] += 1;
                    self.health[idx] = ChipHealth::Degraded;
                    warn!(?chip, consecutive = self.timeouts[idx], "chip write timed out");
                    if self.timeouts[idx] >= config::MAX_CHIP_TIMEOUTS {
                        self.health[idx] = ChipHealth::Fault;
                        error!(?chip, "consecutive timeout limit hit, forcing relax");
                        fault = true;
                    }
                }
                Err(e) => warn!(?chip, channel, error = %e, "chip write failed"),
            }
        }

        if fault {
            self.relax();
        }
    }

    /// Disable every servo channel and cut bus power. Bypasses the angle
    /// mapper entirely: channels get the dedicated full-off sentinel.
    fn relax(&mut self) {
        let sentinel = self.mapper.disable();
        if let Err(e) = self.hw.chip_a.set_all(sentinel) {
            warn!(error = %e, "chip A did not acknowledge relax");
        }
        if let Err(e) = self.hw.chip_b.set_all(sentinel) {
            warn!(error = %e, "chip B did not acknowledge relax");
        }
        self.hw.power.set_powered(false);
        self.gait.hold();
        self.relaxed = true;
        info!("servos relaxed");
    }

    /// Re-power the bus and stand back up at the neutral stance.
    fn resume(&mut self) {
        if self.health.contains(&ChipHealth::Fault) {
            // A resume is an operator decision to retry a faulted chip.
            self.health = [ChipHealth::Ok; 2];
            self.timeouts = [0; 2];
        }
        self.relaxed = false;
        self.gait.stand();
        self.startup();
    }

    fn publish_telemetry(&self) {
        self.telemetry_tx.send_replace(Telemetry {
            attitude: self.estimator.attitude(),
            pattern: self.gait.pattern(),
            phase: self.gait.phase(),
            idle: self.gait.is_idle(),
            joint_angles: self.last_joint_angles,
            chip_a: self.health[0],
            chip_b: self.health[1],
            stabilization_enabled: self.stabilization.enabled(),
            attitude_stale: self.estimator.is_stale(),
            calibration_warning: self.calibration_warning,
            relaxed: self.relaxed,
        });
    }

    #[cfg(test)]
    fn joint_angles(&self) -> [JointAngles; 6] {
        self.last_joint_angles
    }

    /// Drive the loop until the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.startup();
        let mut tick = interval(Duration::from_millis(1000 / config::LOOP_HZ));
        info!(
            hz = config::LOOP_HZ,
            watchdog_ms = config::CMD_TIMEOUT.as_millis(),
            "control loop started"
        );

        loop {
            tick.tick().await;

            // At most one command per tick.
            match commands.try_recv() {
                Ok(cmd) => self.on_command(cmd),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    info!("command channel closed, relaxing and shutting down");
                    self.relax();
                    self.publish_telemetry();
                    return;
                }
            }

            self.tick_once();
        }
    }
}
