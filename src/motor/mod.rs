// Motor control for the three-wheel omni base
//
// Provides:
// - Omniwheel inverse kinematics (heading/speeds -> wheel speeds)
// - Sign-magnitude H-bridge mapping (wheel speed -> pin pulse widths)

mod driver;
pub mod kinematics;

pub use driver::{Drivetrain, PinPair, clip_speed, drive_command};
pub use kinematics::{Geometry, WheelSpeeds, wheel_speeds};
