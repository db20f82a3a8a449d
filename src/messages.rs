// Values passed between the stages of one control tick

use serde::{Deserialize, Serialize};

// One pulse-width command for the PWM bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwmCommand {
    pub channel: u8,
    pub on: u16,
    pub off: u16,
}

impl PwmCommand {
    // onTick is always 0 for this robot
    pub fn pulse(channel: u8, off: u16) -> Self {
        Self { channel, on: 0, off }
    }
}

/// Desired planar motion of the base
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionIntent {
    /// Radians, 0 = wheel 1 reference direction
    pub heading: f64,
    pub linear_speed: f64,
    pub angular_speed: f64,
}

impl MotionIntent {
    pub fn stop() -> Self {
        Self::default()
    }
}

/// Outcome of a single control tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    Running,
    Stopped,
}
