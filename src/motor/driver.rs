// Sign-magnitude drive for the three wheels
//
// Each wheel has an H-bridge pin pair; the sign of the speed picks which
// pin carries the pulse width and the other is held at 0.

use tracing::debug;

use super::kinematics::{Geometry, WheelSpeeds};
use crate::config::{MOTOR_PINS, WHEEL_SPEED_MAX};
use crate::messages::{MotionIntent, PwmCommand};
use crate::pwm::{PwmError, PwmSink};

/// Pulse widths for one H-bridge pin pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinPair {
    pub a: u16,
    pub b: u16,
}

/// Scale, round and clip a signed wheel speed to ±WHEEL_SPEED_MAX
pub fn clip_speed(speed: f64, scale: f64) -> i32 {
    let max = WHEEL_SPEED_MAX as f64;
    (speed * scale).round().clamp(-max, max) as i32
}

/// Map a wheel speed onto its pin pair: positive drives B, negative drives A
pub fn drive_command(speed: f64, scale: f64) -> PinPair {
    let s = clip_speed(speed, scale);
    let magnitude = s.unsigned_abs() as u16;

    if s > 0 {
        PinPair { a: 0, b: magnitude }
    } else {
        PinPair { a: magnitude, b: 0 }
    }
}

/// The three-wheel base as seen from the PWM bridge
#[derive(Debug, Clone)]
pub struct Drivetrain {
    geometry: Geometry,
    scale: [f64; 3],
    pins: [(u8, u8); 3],
}

impl Drivetrain {
    pub fn new(geometry: Geometry, scale: [f64; 3]) -> Self {
        Self::with_pins(geometry, scale, MOTOR_PINS)
    }

    /// Create with custom pin assignment
    pub fn with_pins(geometry: Geometry, scale: [f64; 3], pins: [(u8, u8); 3]) -> Self {
        Self {
            geometry,
            scale,
            pins,
        }
    }

    /// Pin commands for a motion intent: [wheel1 A, wheel1 B, wheel2 A, ...]
    pub fn commands(&self, intent: &MotionIntent) -> [PwmCommand; 6] {
        let speeds = self.geometry.wheel_speeds_for(intent);
        debug!(
            "dir={:.3}, v_linear={:.1}, v_angular={:.1} -> v1={:.1}, v2={:.1}, v3={:.1}",
            intent.heading,
            intent.linear_speed,
            intent.angular_speed,
            speeds.0[0],
            speeds.0[1],
            speeds.0[2]
        );
        self.pin_commands(speeds)
    }

    pub fn pin_commands(&self, speeds: WheelSpeeds) -> [PwmCommand; 6] {
        let mut out = [PwmCommand::pulse(0, 0); 6];
        for (i, &speed) in speeds.as_array().iter().enumerate() {
            let pair = drive_command(speed, self.scale[i]);
            let (pin_a, pin_b) = self.pins[i];
            out[2 * i] = PwmCommand::pulse(pin_a, pair.a);
            out[2 * i + 1] = PwmCommand::pulse(pin_b, pair.b);
        }
        out
    }

    /// Send body motion to the wheels
    pub fn drive(&self, sink: &mut dyn PwmSink, intent: &MotionIntent) -> Result<(), PwmError> {
        for cmd in self.commands(intent) {
            sink.send(cmd)?;
        }
        Ok(())
    }

    /// Drive every motor pin to 0
    pub fn stop(&self, sink: &mut dyn PwmSink) -> Result<(), PwmError> {
        debug!("Stopping all motors");
        self.drive(sink, &MotionIntent::stop())
    }
}
