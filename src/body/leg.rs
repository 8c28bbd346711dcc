// Static description of one leg: where it attaches, how it is mounted and
// which servo channels drive it. Mirroring is resolved here once; the angle
// transform in the kinematics module is parameterized by the flag instead of
// branching per call site.

use crate::config;

#[derive(Debug, Clone)]
pub struct LegGeometry {
    pub id: u8,
    /// Standing foot position in the body frame, mm (z filled from height).
    pub body_point: [f32; 3],
    /// Mounting rotation from the body X axis, degrees.
    pub mount_angle: f32,
    /// Distance from body centre to the coxa pivot, mm.
    pub mount_offset: f32,
    /// True for the lateral group mounted rotated 180 degrees.
    pub mirrored: bool,
    pub coxa_len: f32,
    pub femur_len: f32,
    pub tibia_len: f32,
    /// Logical servo channels [coxa, femur, tibia].
    pub channels: [u8; 3],
    /// Per-joint calibration offsets, degrees. Mutated only by the
    /// calibration commands.
    pub calibration: [f32; 3],
}

impl LegGeometry {
    pub fn hexapod() -> [LegGeometry; 6] {
        std::array::from_fn(|i| LegGeometry {
            id: i as u8,
            body_point: config::BODY_POINTS[i],
            mount_angle: config::MOUNT_ANGLES[i],
            mount_offset: config::MOUNT_OFFSETS[i],
            mirrored: config::MIRRORED[i],
            coxa_len: config::COXA_LEN,
            femur_len: config::FEMUR_LEN,
            tibia_len: config::TIBIA_LEN,
            channels: config::SERVO_CHANNELS[i],
            calibration: [0.0; 3],
        })
    }

    /// Rotate a body-frame foot point into this leg's local frame.
    pub fn body_to_local(&self, point: [f32; 3]) -> [f32; 3] {
        let a = self.mount_angle.to_radians();
        let (sin_a, cos_a) = a.sin_cos();
        [
            point[0] * cos_a + point[1] * sin_a - self.mount_offset,
            -point[0] * sin_a + point[1] * cos_a,
            point[2] - config::MOUNT_HEIGHT,
        ]
    }
}
