// 3-DOF leg solver (coxa yaw + planar femur/tibia pair).
//
// Angles are solver-frame degrees: coxa is servo-centred (90 points straight
// out along the leg's local +X), femur is the elevation of the upper segment
// above horizontal, tibia is the interior knee angle. The forward solver is
// the algebraic inverse of the inverse solver, so the pair round-trips.

use tracing::warn;

use crate::body::LegGeometry;
use crate::error::{Error, Result};

/// Joint angles in the solver frame, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolvedAngles {
    pub coxa: f32,
    pub femur: f32,
    pub tibia: f32,
}

pub struct LegKinematics {
    leg: u8,
    l1: f32,
    l2: f32,
    l3: f32,
    /// Planar reach bounds from the femur pivot.
    max_reach: f32,
    min_reach: f32,
}

// Stay strictly inside the annulus when clamping so acos never sees an
// argument on the boundary.
const REACH_MARGIN: f32 = 1e-3;

impl LegKinematics {
    pub fn new(leg: u8, coxa_len: f32, femur_len: f32, tibia_len: f32) -> Self {
        Self {
            leg,
            l1: coxa_len,
            l2: femur_len,
            l3: tibia_len,
            max_reach: femur_len + tibia_len,
            min_reach: (femur_len - tibia_len).abs(),
        }
    }

    pub fn for_leg(geometry: &LegGeometry) -> Self {
        Self::new(
            geometry.id,
            geometry.coxa_len,
            geometry.femur_len,
            geometry.tibia_len,
        )
    }

    /// Inverse kinematics. Fails when the target lies outside the reachable
    /// annulus of the femur/tibia pair.
    pub fn solve(&self, target: [f32; 3]) -> Result<SolvedAngles> {
        let [x, y, z] = target;
        let l_xy = x.hypot(y);
        let coxa = if l_xy < 1e-3 {
            90.0
        } else {
            90.0 + y.atan2(x).to_degrees()
        };

        // Planar sub-problem in the plane the coxa points into.
        let r = l_xy - self.l1;
        let d = r.hypot(z);
        if d > self.max_reach || d < self.min_reach {
            return Err(Error::UnreachableTarget {
                leg: self.leg,
                x,
                y,
                z,
            });
        }

        let cos_tibia =
            ((self.l2 * self.l2 + self.l3 * self.l3 - d * d) / (2.0 * self.l2 * self.l3))
                .clamp(-1.0, 1.0);
        let tibia = cos_tibia.acos().to_degrees();

        let alpha = z.atan2(r);
        let cos_beta = ((self.l2 * self.l2 + d * d - self.l3 * self.l3) / (2.0 * self.l2 * d))
            .clamp(-1.0, 1.0);
        let femur = (alpha + cos_beta.acos()).to_degrees();

        Ok(SolvedAngles { coxa, femur, tibia })
    }

    /// Pull a target radially to the nearest reachable point, then solve.
    /// Used by the control loop, where a transiently out-of-range target
    /// must bend the leg toward it rather than abort the tick.
    pub fn solve_clamped(&self, target: [f32; 3]) -> Result<SolvedAngles> {
        self.solve(self.clamp_to_reach(target))
    }

    /// Project a target onto the reachable annulus. Reachable targets pass
    /// through unchanged.
    pub fn clamp_to_reach(&self, target: [f32; 3]) -> [f32; 3] {
        let [x, y, z] = target;
        let l_xy = x.hypot(y);
        let r = l_xy - self.l1;
        let d = r.hypot(z);

        let bound = if d > self.max_reach - REACH_MARGIN {
            self.max_reach - REACH_MARGIN
        } else if d < self.min_reach + REACH_MARGIN {
            self.min_reach + REACH_MARGIN
        } else {
            return target;
        };

        warn!(leg = self.leg, x, y, z, "foot target out of reach, clamping");

        if d < 1e-3 {
            // Degenerate target at the femur pivot: push straight out.
            let scale = (self.l1 + self.min_reach + REACH_MARGIN) / l_xy.max(1e-3);
            return [x * scale, y * scale, 0.0];
        }

        let s = bound / d;
        let new_l_xy = self.l1 + r * s;
        if l_xy < 1e-3 {
            return [new_l_xy, 0.0, z * s];
        }
        let xy_scale = new_l_xy / l_xy;
        [x * xy_scale, y * xy_scale, z * s]
    }

    /// Forward kinematics, the exact inverse of `solve`.
    pub fn forward(&self, angles: &SolvedAngles) -> [f32; 3] {
        let c = (angles.coxa - 90.0).to_radians();
        let f = angles.femur.to_radians();
        let t = angles.tibia.to_radians();

        // Interior knee angle: the tibia segment folds back from the femur
        // direction by (180 - tibia).
        let r = self.l2 * f.cos() - self.l3 * (f + t).cos();
        let z = self.l2 * f.sin() - self.l3 * (f + t).sin();
        let l_xy = self.l1 + r;
        [l_xy * c.cos(), l_xy * c.sin(), z]
    }

    /// Apply the mounting-orientation correction and calibration offsets,
    /// producing physical servo angles [coxa, femur, tibia] in 0-180.
    ///
    /// One lateral leg group is mounted rotated 180 degrees, so its femur
    /// and tibia servos run in the opposite sense.
    pub fn servo_angles(angles: &SolvedAngles, geometry: &LegGeometry) -> [f32; 3] {
        let cal = geometry.calibration;
        let coxa = angles.coxa + cal[0];
        let (femur, tibia) = if geometry.mirrored {
            (
                90.0 + angles.femur + cal[1],
                180.0 - (angles.tibia + cal[2]),
            )
        } else {
            (90.0 - (angles.femur + cal[1]), angles.tibia + cal[2])
        };
        [
            coxa.clamp(0.0, 180.0),
            femur.clamp(0.0, 180.0),
            tibia.clamp(0.0, 180.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn solver() -> LegKinematics {
        LegKinematics::new(0, config::COXA_LEN, config::FEMUR_LEN, config::TIBIA_LEN)
    }

    fn geometry(mirrored: bool) -> LegGeometry {
        let mut geo = LegGeometry::hexapod()[if mirrored { 3 } else { 0 }].clone();
        geo.calibration = [0.0; 3];
        assert_eq!(geo.mirrored, mirrored);
        geo
    }

    #[test]
    fn neutral_target_centres_coxa() {
        let angles = solver().solve([140.0, 0.0, -100.0]).unwrap();
        assert!((angles.coxa - 90.0).abs() < 1e-3);
        assert!(angles.femur.is_finite() && angles.tibia.is_finite());
    }

    #[test]
    fn round_trip_under_half_millimetre() {
        let kin = solver();
        let mut solved = 0;
        for x in [100.0_f32, 120.0, 140.0, 160.0] {
            for y in [-40.0_f32, -20.0, 0.0, 20.0, 40.0] {
                for z in [-140.0_f32, -110.0, -80.0, -50.0] {
                    let target = [x, y, z];
                    let Ok(angles) = kin.solve(target) else {
                        continue;
                    };
                    solved += 1;
                    let back = kin.forward(&angles);
                    let err = ((back[0] - x).powi(2)
                        + (back[1] - y).powi(2)
                        + (back[2] - z).powi(2))
                    .sqrt();
                    assert!(err < 0.5, "target {target:?} round-tripped to {back:?}");
                }
            }
        }
        assert!(solved > 40, "grid mostly unreachable ({solved} solved)");
    }

    #[test]
    fn rejects_targets_outside_annulus() {
        let kin = solver();
        // Beyond full extension.
        assert!(matches!(
            kin.solve([400.0, 0.0, 0.0]),
            Err(Error::UnreachableTarget { .. })
        ));
        // Inside the folded minimum, right at the femur pivot.
        assert!(matches!(
            kin.solve([config::COXA_LEN, 0.0, -5.0]),
            Err(Error::UnreachableTarget { .. })
        ));
    }

    #[test]
    fn clamp_projects_onto_annulus() {
        let kin = solver();
        let clamped = kin.clamp_to_reach([400.0, 0.0, -50.0]);
        let angles = kin.solve(clamped).unwrap();
        // Clamped target sits on the outer boundary: the knee is nearly
        // straight.
        assert!((angles.tibia - 180.0).abs() < 1.0);

        // Reachable targets pass through untouched.
        let target = [140.0, 0.0, -100.0];
        assert_eq!(kin.clamp_to_reach(target), target);
    }

    #[test]
    fn mirrored_transform_runs_opposite_sense() {
        let angles = SolvedAngles {
            coxa: 90.0,
            femur: 30.0,
            tibia: 70.0,
        };
        let plain = LegKinematics::servo_angles(&angles, &geometry(false));
        let mirrored = LegKinematics::servo_angles(&angles, &geometry(true));
        assert_eq!(plain, [90.0, 60.0, 70.0]);
        assert_eq!(mirrored, [90.0, 120.0, 110.0]);
    }

    #[test]
    fn calibration_offset_follows_servo_sense() {
        let angles = SolvedAngles {
            coxa: 90.0,
            femur: 30.0,
            tibia: 70.0,
        };
        let mut plain = geometry(false);
        plain.calibration = [0.0, 5.0, 5.0];
        let mut mirrored = geometry(true);
        mirrored.calibration = [0.0, 5.0, 5.0];

        // A +5 femur offset subtracts on the plain side and adds on the
        // mirrored side; tibia is the reverse.
        assert_eq!(
            LegKinematics::servo_angles(&angles, &plain),
            [90.0, 55.0, 75.0]
        );
        assert_eq!(
            LegKinematics::servo_angles(&angles, &mirrored),
            [90.0, 125.0, 105.0]
        );
    }

    #[test]
    fn servo_angles_clamped_to_range() {
        let angles = SolvedAngles {
            coxa: 200.0,
            femur: 120.0,
            tibia: 10.0,
        };
        let out = LegKinematics::servo_angles(&angles, &geometry(false));
        assert_eq!(out[0], 180.0);
        assert_eq!(out[1], 0.0);
    }
}
