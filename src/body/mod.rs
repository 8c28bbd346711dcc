// Body model: per-leg geometry and the kinematics solver.

pub mod kinematics;
pub mod leg;

pub use kinematics::{LegKinematics, SolvedAngles};
pub use leg::LegGeometry;
