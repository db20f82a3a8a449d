// Omniwheel inverse kinematics for the three-wheel base
// Projects the desired planar velocity onto each wheel's rolling direction.

use crate::config::WHEEL_ANGLES;
use crate::messages::MotionIntent;

/// Signed speed per wheel, before output scaling and clipping
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelSpeeds(pub [f64; 3]);

impl WheelSpeeds {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn as_array(&self) -> [f64; 3] {
        self.0
    }
}

/// Fixed wheel layout of the base
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Mounting angle of each wheel (radians)
    pub wheel_angles: [f64; 3],
    /// How much of the angular speed each wheel carries
    pub angular_gain: [f64; 3],
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            wheel_angles: WHEEL_ANGLES,
            angular_gain: [1.0; 3],
        }
    }
}

impl Geometry {
    pub fn with_angular_gain(angular_gain: [f64; 3]) -> Self {
        Self {
            angular_gain,
            ..Self::default()
        }
    }

    /// Convert heading / linear / angular speed into wheel speeds
    ///
    /// v_i = linear * cos(angle_i + heading) + gain_i * angular
    pub fn wheel_speeds(&self, heading: f64, linear_speed: f64, angular_speed: f64) -> WheelSpeeds {
        let (sin_h, cos_h) = heading.sin_cos();
        let mut speeds = [0.0f64; 3];

        for (i, &angle) in self.wheel_angles.iter().enumerate() {
            let (sin_a, cos_a) = angle.sin_cos();
            speeds[i] = linear_speed * (cos_a * cos_h - sin_a * sin_h)
                + self.angular_gain[i] * angular_speed;
        }

        WheelSpeeds(speeds)
    }

    pub fn wheel_speeds_for(&self, intent: &MotionIntent) -> WheelSpeeds {
        self.wheel_speeds(intent.heading, intent.linear_speed, intent.angular_speed)
    }
}

/// Wheel speeds for the stock layout with equal angular contribution
pub fn wheel_speeds(heading: f64, linear_speed: f64, angular_speed: f64) -> WheelSpeeds {
    Geometry::default().wheel_speeds(heading, linear_speed, angular_speed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KEY_SPEED, WHEEL1_ANGLE};
    use std::f64::consts::PI;

    const EPS: f64 = 1e-9;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < EPS, "{} != {}", a, b);
    }

    #[test]
    fn test_zero_velocity() {
        assert_eq!(wheel_speeds(1.3, 0.0, 0.0), WheelSpeeds::zero());
    }

    #[test]
    fn test_matches_projection_formula() {
        for &(heading, linear, angular) in &[
            (0.0, 3000.0, 0.0),
            (0.7, 1200.0, -400.0),
            (-2.5, 4095.0, 4095.0),
            (PI * 3.0 / 2.0, 10.0, 1.0),
        ] {
            let speeds = wheel_speeds(heading, linear, angular).as_array();
            for (i, &angle) in WHEEL_ANGLES.iter().enumerate() {
                assert_close(speeds[i], linear * (angle + heading).cos() + angular);
            }
        }
    }

    #[test]
    fn test_rotation_only() {
        // Pure rotation spins every wheel at the angular speed
        let speeds = wheel_speeds(0.9, 0.0, 1500.0).as_array();
        for s in speeds {
            assert_close(s, 1500.0);
        }
    }

    #[test]
    fn test_forward_motion() {
        let speeds = wheel_speeds(0.0, KEY_SPEED, 0.0).as_array();
        for (i, &angle) in WHEEL_ANGLES.iter().enumerate() {
            assert_close(speeds[i], KEY_SPEED * angle.cos());
        }
        // Wheel 1 is perpendicular to heading 0
        assert!(speeds[0].abs() < 1e-6);
    }

    #[test]
    fn test_heading_along_wheel1() {
        // heading = WHEEL1_ANGLE, L = 3000: wheel 1 sees cos(pi) while the others split the rest
        let speeds = wheel_speeds(WHEEL1_ANGLE, 3000.0, 0.0).as_array();
        assert_close(speeds[0], 3000.0 * (2.0 * WHEEL1_ANGLE).cos());
        assert_close(speeds[1], 3000.0 * (WHEEL_ANGLES[1] + WHEEL1_ANGLE).cos());
        assert_close(speeds[2], 3000.0 * (WHEEL_ANGLES[2] + WHEEL1_ANGLE).cos());
        assert_close(speeds[0], -3000.0);
        assert_close(speeds[1], 1500.0);
        assert_close(speeds[2], 1500.0);
    }

    #[test]
    fn test_angular_gain_per_wheel() {
        let geometry = Geometry::with_angular_gain([1.0, 0.5, 2.0]);
        let speeds = geometry.wheel_speeds(0.0, 0.0, 100.0).as_array();
        assert_close(speeds[0], 100.0);
        assert_close(speeds[1], 50.0);
        assert_close(speeds[2], 200.0);
    }
}
