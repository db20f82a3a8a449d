// Keyboard teleop: numeric pad = heading presets, 5 = halt, a/s/d = rotate, q/Esc/Ctrl-C = quit
//
// Raw mode is acquired and released by the binary; this module only maps keys
// and pumps key presses into the control loop.

use std::f64::consts::PI;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::{InputError, RawInput};
use crate::config::KEY_SPEED;
use crate::messages::MotionIntent;

const KEY_POLL: Duration = Duration::from_millis(50);

pub const QUIT_KEY: char = 'q';

/// What a single key press asks for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyCommand {
    Quit,
    /// Set angular speed, keep translation
    Rotate(f64),
    /// Set heading and linear speed, keep rotation
    Translate { heading: f64, speed: f64 },
}

impl KeyCommand {
    pub fn from_char(c: char) -> Option<Self> {
        let translate = |heading: f64| Self::Translate {
            heading,
            speed: KEY_SPEED,
        };
        let cmd = match c {
            QUIT_KEY => Self::Quit,
            'a' => Self::Rotate(KEY_SPEED),
            's' => Self::Rotate(0.0),
            'd' => Self::Rotate(-KEY_SPEED),
            '1' => translate(-PI * 3.0 / 2.0),
            '2' => translate(PI),
            '3' => translate(PI * 3.0 / 2.0),
            '4' => translate(PI / 2.0),
            '5' => Self::Translate {
                heading: 0.0,
                speed: 0.0,
            },
            '6' => translate(-PI / 2.0),
            '7' => translate(PI / 4.0),
            '8' => translate(0.0),
            '9' => translate(-PI / 4.0),
            _ => return None,
        };
        Some(cmd)
    }
}

/// Latched keyboard motion; each key changes only the part it names
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyState {
    intent: MotionIntent,
    quit: bool,
}

impl KeyState {
    pub fn apply(&mut self, cmd: KeyCommand) {
        match cmd {
            KeyCommand::Quit => self.quit = true,
            KeyCommand::Rotate(speed) => self.intent.angular_speed = speed,
            KeyCommand::Translate { heading, speed } => {
                self.intent.heading = heading;
                self.intent.linear_speed = speed;
            }
        }
    }

    pub fn intent(&self) -> MotionIntent {
        self.intent
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }
}

/// Start the key reader thread (terminal must already be in raw mode)
pub fn spawn_reader(tx: UnboundedSender<RawInput>) -> Result<(), InputError> {
    thread::Builder::new()
        .name("keyboard".into())
        .spawn(move || pump_keys(tx))?;
    Ok(())
}

/// Translate a terminal event into loop input
///
/// Raw mode swallows SIGINT, so Ctrl-C arrives here as a key and quits like Esc.
pub fn key_input(event: &Event) -> Option<RawInput> {
    let Event::Key(KeyEvent {
        code,
        modifiers,
        kind: KeyEventKind::Press,
        ..
    }) = event
    else {
        return None;
    };

    match code {
        KeyCode::Esc => Some(RawInput::Key(QUIT_KEY)),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            Some(RawInput::Key(QUIT_KEY))
        }
        KeyCode::Char(c) => Some(RawInput::Key(*c)),
        _ => None,
    }
}

fn pump_keys(tx: UnboundedSender<RawInput>) {
    loop {
        if tx.is_closed() {
            return;
        }
        match event::poll(KEY_POLL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                warn!("Keyboard poll failed: {}", e);
                return;
            }
        }
        match event::read() {
            Ok(ev) => {
                if let Some(input) = key_input(&ev) {
                    debug!("Key pressed: {:?}", input);
                    if tx.send(input).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                warn!("Keyboard read failed: {}", e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_map() {
        assert_eq!(KeyCommand::from_char('q'), Some(KeyCommand::Quit));
        assert_eq!(KeyCommand::from_char('d'), Some(KeyCommand::Rotate(-KEY_SPEED)));
        assert_eq!(
            KeyCommand::from_char('2'),
            Some(KeyCommand::Translate {
                heading: PI,
                speed: KEY_SPEED
            })
        );
        assert_eq!(KeyCommand::from_char('x'), None);
        assert_eq!(KeyCommand::from_char('0'), None);
    }

    #[test]
    fn test_keys_latch_independently() {
        let mut keys = KeyState::default();
        keys.apply(KeyCommand::from_char('7').unwrap());
        keys.apply(KeyCommand::from_char('a').unwrap());

        let intent = keys.intent();
        assert_eq!(intent.heading, PI / 4.0);
        assert_eq!(intent.linear_speed, KEY_SPEED);
        assert_eq!(intent.angular_speed, KEY_SPEED);

        // 5 halts translation but keeps rotating
        keys.apply(KeyCommand::from_char('5').unwrap());
        let intent = keys.intent();
        assert_eq!(intent.heading, 0.0);
        assert_eq!(intent.linear_speed, 0.0);
        assert_eq!(intent.angular_speed, KEY_SPEED);
        assert!(!keys.quit_requested());

        keys.apply(KeyCommand::Quit);
        assert!(keys.quit_requested());
    }

    #[test]
    fn test_ctrl_c_and_esc_quit() {
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        let esc = Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));

        for ev in [ctrl_c, esc] {
            let Some(RawInput::Key(c)) = key_input(&ev) else {
                panic!("{:?} not forwarded", ev);
            };
            assert_eq!(KeyCommand::from_char(c), Some(KeyCommand::Quit));
        }
    }

    #[test]
    fn test_plain_keys_forwarded() {
        let c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE));
        assert_eq!(key_input(&c), Some(RawInput::Key('c')));

        let eight = Event::Key(KeyEvent::new(KeyCode::Char('8'), KeyModifiers::NONE));
        assert_eq!(key_input(&eight), Some(RawInput::Key('8')));

        let mut release = KeyEvent::new(KeyCode::Char('8'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(key_input(&Event::Key(release)), None);

        let arrow = Event::Key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(key_input(&arrow), None);
        assert_eq!(key_input(&Event::FocusGained), None);
    }
}
