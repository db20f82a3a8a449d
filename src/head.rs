// Animatronic head: two mirrored tilt servos and a jaw
//
// Servo positions never jump; each control tick moves every channel at most
// `rate` ticks toward its target. The left tilt servo is mounted mirrored,
// so its command is reflected around TILT_LEFT_OFFSET.

use std::num::NonZeroU16;

use tracing::debug;

use crate::config::{
    JAW_CLOSED, JAW_OPEN, SERVO_COUNT, SERVO_JAW, SERVO_LEFT_TILT, SERVO_MAX, SERVO_MIN,
    SERVO_POWER_ON_POS, SERVO_RIGHT_TILT, TILT_CENTER, TILT_DOWN, TILT_LEFT_OFFSET, TILT_UP,
};
use crate::messages::PwmCommand;
use crate::pwm::{PwmError, PwmSink};

/// Move `position` toward `target` by at most `rate`, never overshooting
pub fn step(position: u16, target: u16, rate: NonZeroU16) -> u16 {
    let rate = rate.get();
    if position < target {
        position.saturating_add(rate).min(target)
    } else if position > target {
        position.saturating_sub(rate).max(target)
    } else {
        position
    }
}

/// Every value a ramp from `start` visits up to and including `end`
pub fn ramp(start: u16, end: u16, rate: NonZeroU16) -> impl Iterator<Item = u16> {
    let mut next = Some(start);
    std::iter::from_fn(move || {
        let current = next?;
        next = (current != end).then(|| step(current, end, rate));
        Some(current)
    })
}

/// Reflect a right-side tilt value onto the left servo
pub fn mirror_left(right: u16) -> u16 {
    let mirrored = 2 * TILT_LEFT_OFFSET as i32 - right as i32;
    mirrored.clamp(0, u16::MAX as i32) as u16
}

/// Channel commands for a logical tilt pair
///
/// Each logical tilt is clamped to [TILT_UP, TILT_DOWN], the left one is
/// mirrored, then both are clamped to their channel limits.
pub fn tilt_commands(left_tilt: u16, right_tilt: u16) -> (u16, u16) {
    let left = mirror_left(left_tilt.clamp(TILT_UP, TILT_DOWN));
    let right = right_tilt.clamp(TILT_UP, TILT_DOWN);
    (
        left.clamp(SERVO_MIN[SERVO_LEFT_TILT], SERVO_MAX[SERVO_LEFT_TILT]),
        right.clamp(SERVO_MIN[SERVO_RIGHT_TILT], SERVO_MAX[SERVO_RIGHT_TILT]),
    )
}

/// Logical head pose requested by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadPose {
    /// Logical tilt of the left side (before mirroring)
    pub left_tilt: u16,
    pub right_tilt: u16,
    pub jaw: u16,
}

impl HeadPose {
    pub fn center() -> Self {
        Self::pitch(TILT_CENTER)
    }

    /// Nod: both sides tilt together
    pub fn pitch(tilt: u16) -> Self {
        Self {
            left_tilt: tilt,
            right_tilt: tilt,
            jaw: JAW_CLOSED,
        }
    }

    /// Roll: sides tilt in opposite directions
    pub fn roll(left_tilt: u16, right_tilt: u16) -> Self {
        Self {
            left_tilt,
            right_tilt,
            jaw: JAW_CLOSED,
        }
    }

    pub fn with_jaw_open(mut self, open: bool) -> Self {
        self.jaw = if open { JAW_OPEN } else { JAW_CLOSED };
        self
    }

    /// Per-channel servo targets [left tilt, right tilt, jaw]
    pub fn targets(&self) -> [u16; SERVO_COUNT] {
        let (left, right) = tilt_commands(self.left_tilt, self.right_tilt);
        let mut targets = [0u16; SERVO_COUNT];
        targets[SERVO_LEFT_TILT] = left;
        targets[SERVO_RIGHT_TILT] = right;
        targets[SERVO_JAW] = self.jaw.clamp(SERVO_MIN[SERVO_JAW], SERVO_MAX[SERVO_JAW]);
        targets
    }
}

impl Default for HeadPose {
    fn default() -> Self {
        Self::center()
    }
}

/// Current and target position of every head servo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoBank {
    positions: [u16; SERVO_COUNT],
    targets: [u16; SERVO_COUNT],
    rates: [NonZeroU16; SERVO_COUNT],
}

impl ServoBank {
    /// Servos at their power-on position with the head snapped to center
    pub fn new(rates: [NonZeroU16; SERVO_COUNT]) -> Self {
        let targets = HeadPose::center().targets();
        let mut positions = [SERVO_POWER_ON_POS; SERVO_COUNT];
        positions[SERVO_LEFT_TILT] = targets[SERVO_LEFT_TILT];
        positions[SERVO_RIGHT_TILT] = targets[SERVO_RIGHT_TILT];

        Self {
            positions,
            targets,
            rates,
        }
    }

    pub fn positions(&self) -> [u16; SERVO_COUNT] {
        self.positions
    }

    pub fn targets(&self) -> [u16; SERVO_COUNT] {
        self.targets
    }

    pub fn set_pose(&mut self, pose: &HeadPose) {
        self.targets = pose.targets();
    }

    pub fn converged(&self) -> bool {
        self.positions == self.targets
    }

    /// Advance every channel one ramp step
    pub fn advance(&mut self) -> [u16; SERVO_COUNT] {
        for i in 0..SERVO_COUNT {
            self.positions[i] = step(self.positions[i], self.targets[i], self.rates[i]);
        }
        self.positions
    }

    pub fn commands(&self) -> [PwmCommand; SERVO_COUNT] {
        let mut out = [PwmCommand::pulse(0, 0); SERVO_COUNT];
        for (i, &pos) in self.positions.iter().enumerate() {
            out[i] = PwmCommand::pulse(i as u8, pos);
        }
        out
    }

    /// Send the current positions to the servo channels
    pub fn emit(&self, sink: &mut dyn PwmSink) -> Result<(), PwmError> {
        debug!("Servo positions: {:?} -> {:?}", self.positions, self.targets);
        for cmd in self.commands() {
            sink.send(cmd)?;
        }
        Ok(())
    }
}
