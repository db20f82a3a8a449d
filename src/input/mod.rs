// Operator input: joystick event stream or keyboard
//
// Reader threads push raw input into a channel; the control loop drains it
// without blocking through the `InputSource` trait.

pub mod joystick;
pub mod keyboard;

use std::collections::VecDeque;

use tokio::sync::mpsc::{UnboundedReceiver, error::TryRecvError};

pub use joystick::{AxisId, ButtonId, DecodeError, InputState, JsEvent, JsRecord};
pub use keyboard::{KeyCommand, KeyState};

/// Undecoded input as produced by a reader thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    /// One joystick record (short only if the stream ended mid-record)
    Joystick(Vec<u8>),
    Key(char),
}

/// Result of a non-blocking poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled {
    Ready(RawInput),
    /// Nothing pending this tick
    Empty,
    /// The source is gone and will never produce input again
    Closed,
}

/// Errors starting an input source
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to open input device {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start input reader: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Non-blocking source of operator input
pub trait InputSource {
    fn try_next(&mut self) -> Polled;
}

impl InputSource for UnboundedReceiver<RawInput> {
    fn try_next(&mut self) -> Polled {
        match self.try_recv() {
            Ok(raw) => Polled::Ready(raw),
            Err(TryRecvError::Empty) => Polled::Empty,
            Err(TryRecvError::Disconnected) => Polled::Closed,
        }
    }
}

/// Pre-recorded input, one item per poll; `None` entries poll as empty
#[derive(Debug, Default)]
pub struct ScriptedInput {
    items: VecDeque<Option<RawInput>>,
    close_when_done: bool,
}

impl ScriptedInput {
    pub fn new(items: impl IntoIterator<Item = Option<RawInput>>) -> Self {
        Self {
            items: items.into_iter().collect(),
            close_when_done: false,
        }
    }

    /// Report `Closed` once the script is exhausted instead of `Empty`
    pub fn closing(mut self) -> Self {
        self.close_when_done = true;
        self
    }
}

impl InputSource for ScriptedInput {
    fn try_next(&mut self) -> Polled {
        match self.items.pop_front() {
            Some(Some(raw)) => Polled::Ready(raw),
            Some(None) => Polled::Empty,
            None if self.close_when_done => Polled::Closed,
            None => Polled::Empty,
        }
    }
}
