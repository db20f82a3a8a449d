// Actuator exercise: sweep the head, then each motor pin up and back down
//
// Produces frames of PWM commands; the runtime plays one frame per tick.

use crate::config::{
    DEMO_JAW_RATE, DEMO_PIN_RATE, DEMO_TILT_RATE, JAW_CLOSED, JAW_OPEN, MOTOR_PINS, PWM_TICK_MAX,
    SERVO_JAW, SERVO_LEFT_TILT, SERVO_RIGHT_TILT, TILT_DOWN, TILT_UP,
};
use crate::head::{ramp, tilt_commands};
use crate::messages::PwmCommand;

pub type Frame = Vec<PwmCommand>;

fn tilt_sweep(start: u16, end: u16) -> impl Iterator<Item = Frame> {
    ramp(start, end, DEMO_TILT_RATE).map(|tilt| {
        let (left, right) = tilt_commands(tilt, tilt);
        vec![
            PwmCommand::pulse(SERVO_LEFT_TILT as u8, left),
            PwmCommand::pulse(SERVO_RIGHT_TILT as u8, right),
        ]
    })
}

fn jaw_sweep(start: u16, end: u16) -> impl Iterator<Item = Frame> {
    ramp(start, end, DEMO_JAW_RATE).map(|pos| vec![PwmCommand::pulse(SERVO_JAW as u8, pos)])
}

// Unlike the old bench script, the sweep ends on the end value itself
fn pin_sweep(pin: u8, start: u16, end: u16) -> impl Iterator<Item = Frame> {
    ramp(start, end, DEMO_PIN_RATE).map(move |v| vec![PwmCommand::pulse(pin, v)])
}

/// Full exercise sequence, one frame per control tick
pub fn sequence() -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();

    frames.extend(tilt_sweep(TILT_DOWN, TILT_UP));
    frames.extend(jaw_sweep(JAW_CLOSED, JAW_OPEN));
    frames.extend(tilt_sweep(TILT_UP, TILT_DOWN));
    frames.extend(jaw_sweep(JAW_OPEN, JAW_CLOSED));

    for &(pin_a, pin_b) in &MOTOR_PINS {
        frames.push(vec![PwmCommand::pulse(pin_b, 0)]);
        frames.extend(pin_sweep(pin_a, 0, PWM_TICK_MAX));
        frames.extend(pin_sweep(pin_b, 0, PWM_TICK_MAX));
        frames.extend(pin_sweep(pin_a, PWM_TICK_MAX, 0));
        frames.extend(pin_sweep(pin_b, PWM_TICK_MAX, 0));
    }

    frames.push(
        MOTOR_PINS
            .iter()
            .flat_map(|&(a, b)| [PwmCommand::pulse(a, 0), PwmCommand::pulse(b, 0)])
            .collect(),
    );

    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_shape() {
        let frames = sequence();
        // Tilt: 51 frames each way, jaw: 7 each way
        let head = 51 + 7 + 51 + 7;
        // Per wheel: 1 + 4 sweeps of 411 frames
        let per_wheel = 1 + 4 * 411;
        assert_eq!(frames.len(), head + 3 * per_wheel + 1);

        assert_eq!(
            frames[0],
            vec![PwmCommand::pulse(0, 330), PwmCommand::pulse(1, TILT_DOWN)]
        );
        assert_eq!(
            frames[50],
            vec![PwmCommand::pulse(0, TILT_DOWN), PwmCommand::pulse(1, TILT_UP)]
        );
        assert_eq!(frames[51], vec![PwmCommand::pulse(2, JAW_CLOSED)]);
        assert_eq!(frames[57], vec![PwmCommand::pulse(2, JAW_OPEN)]);
    }

    #[test]
    fn test_pin_sweeps_stay_in_range() {
        let frames = sequence();
        assert!(frames.iter().flatten().all(|c| c.off <= PWM_TICK_MAX && c.on == 0));

        let last = frames.last().unwrap();
        assert_eq!(last.len(), 6);
        assert!(last.iter().all(|c| c.off == 0));
    }
}
