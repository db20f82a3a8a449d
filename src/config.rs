// Channel map, servo limits, drive geometry and loop timing
use std::f64::consts::PI;
use std::num::NonZeroU16;
use std::time::Duration;

// Runtime loop frequency (20 ms tick)
pub const LOOP_HZ: u64 = 50;

// PWM bridge output frequency
pub const PWM_FREQ_HZ: u16 = 60;

// Highest pulse-width tick accepted by the PWM bridge
pub const PWM_TICK_MAX: u16 = 4095;
pub const PWM_CHANNELS: u8 = 16;

// Servo channels
pub const SERVO_LEFT_TILT: usize = 0;
pub const SERVO_RIGHT_TILT: usize = 1;
pub const SERVO_JAW: usize = 2;
pub const SERVO_COUNT: usize = 3;

// Servo positions (pulse-width ticks)
pub const SERVO_POWER_ON_POS: u16 = 400; // midpoint of the 200..600 servo travel
pub const TILT_UP: u16 = 320;
pub const TILT_CENTER: u16 = 380;
pub const TILT_DOWN: u16 = 470;
pub const TILT_LEFT_OFFSET: u16 = 400; // left tilt servo is mounted mirrored around this
pub const JAW_CLOSED: u16 = 320;
pub const JAW_OPEN: u16 = 560;

pub const SERVO_MIN: [u16; SERVO_COUNT] = [TILT_UP, TILT_UP, JAW_CLOSED];
pub const SERVO_MAX: [u16; SERVO_COUNT] = [TILT_DOWN, TILT_DOWN, JAW_OPEN];

// Ramp rates (ticks per control tick); a zero rate would never reach its target
pub const SERVO_RATE: NonZeroU16 = ramp_rate(10);
pub const DEMO_TILT_RATE: NonZeroU16 = ramp_rate(3);
pub const DEMO_JAW_RATE: NonZeroU16 = ramp_rate(40);
pub const DEMO_PIN_RATE: NonZeroU16 = ramp_rate(10);

const fn ramp_rate(rate: u16) -> NonZeroU16 {
    match NonZeroU16::new(rate) {
        Some(rate) => rate,
        None => panic!("ramp rate must be non-zero"),
    }
}

/// H-bridge pin pairs (A, B) per wheel
pub const MOTOR_PINS: [(u8, u8); 3] = [(9, 10), (11, 12), (14, 13)];

/// Per-wheel output scale (wheels 2 and 3 run hot)
pub const MOTOR_SCALE: [f64; 3] = [1.0, 0.9, 0.9];

/// Wheel mounting angles (radians)
pub const WHEEL1_ANGLE: f64 = PI / 2.0;
pub const WHEEL2_ANGLE: f64 = PI + PI / 6.0;
pub const WHEEL3_ANGLE: f64 = -PI / 6.0;
pub const WHEEL_ANGLES: [f64; 3] = [WHEEL1_ANGLE, WHEEL2_ANGLE, WHEEL3_ANGLE];

pub const WHEEL_SPEED_MAX: i32 = 4095;

// Full-scale joystick axis reading
pub const AXIS_MAX: i32 = 32767;

// Linear/angular speed used by keyboard presets
pub const KEY_SPEED: f64 = 3000.0;

// Serial PWM bridge
pub const PWM_PORT: &str = "/dev/ttyUSB0";
pub const PWM_BAUDRATE: u32 = 115_200;
pub const PWM_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

// Default joystick device
pub const JOYSTICK_DEVICE: &str = "/dev/input/js0";

/// Which subsystems the control loop drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subsystems {
    pub drivetrain: bool,
    pub head: bool,
}

impl Default for Subsystems {
    fn default() -> Self {
        Self {
            drivetrain: true,
            head: true,
        }
    }
}

/// Tunables for one control session
#[derive(Debug, Clone)]
pub struct ControlConfig {
    pub loop_hz: u64,
    pub subsystems: Subsystems,
    /// Ramp step per servo channel [left tilt, right tilt, jaw]
    pub servo_rates: [NonZeroU16; SERVO_COUNT],
    /// Output scale applied before clipping, per wheel
    pub motor_scale: [f64; 3],
    /// Contribution of the angular speed to each wheel.
    /// Equal gains assume all wheels sit the same distance from the spin center.
    pub angular_gain: [f64; 3],
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            loop_hz: LOOP_HZ,
            subsystems: Subsystems::default(),
            servo_rates: [SERVO_RATE; SERVO_COUNT],
            motor_scale: MOTOR_SCALE,
            angular_gain: [1.0; 3],
        }
    }
}

impl ControlConfig {
    pub fn tick_period(&self) -> Duration {
        tick_period(self.loop_hz)
    }
}

/// Period of one control tick at `loop_hz`
pub fn tick_period(loop_hz: u64) -> Duration {
    Duration::from_micros(1_000_000 / loop_hz.clamp(1, 1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_period() {
        assert_eq!(ControlConfig::default().tick_period(), Duration::from_millis(20));
        assert_eq!(tick_period(0), Duration::from_secs(1));
        assert!(tick_period(u64::MAX) > Duration::ZERO);
    }

    #[test]
    fn test_servo_limits_cover_presets() {
        for pos in [TILT_UP, TILT_CENTER, TILT_DOWN] {
            assert!(pos >= SERVO_MIN[SERVO_RIGHT_TILT] && pos <= SERVO_MAX[SERVO_RIGHT_TILT]);
        }
        assert_eq!((SERVO_MIN[SERVO_JAW], SERVO_MAX[SERVO_JAW]), (JAW_CLOSED, JAW_OPEN));
    }
}
