// Linux joystick event stream decoding
//
// Each record is 8 bytes, native endian:
// [time: u32, value: i16, type: u8, number: u8]
// The type byte is a bitmask; INIT may be combined with BUTTON or AXIS.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::thread;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::{InputError, RawInput};

pub const JS_EVENT_SIZE: usize = 8;

pub const JS_EVENT_BUTTON: u8 = 0x01;
pub const JS_EVENT_AXIS: u8 = 0x02;
pub const JS_EVENT_INIT: u8 = 0x80;

/// Error types for joystick record decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Short joystick record: expected 8 bytes, got {len}")]
    ShortRecord { len: usize },
}

/// Controller axes, by the number the driver reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisId {
    LeftX,
    LeftY,
    RightX,
    RightY,
    HatX,
    HatY,
    Unknown(u8),
}

impl AxisId {
    pub fn from_number(number: u8) -> Self {
        match number {
            0 => Self::LeftX,
            1 => Self::LeftY,
            2 => Self::RightX,
            3 => Self::RightY,
            4 => Self::HatX,
            5 => Self::HatY,
            n => Self::Unknown(n),
        }
    }
}

/// Controller buttons, by the number the driver reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    Square,
    X,
    O,
    Triangle,
    LTrigger2,
    RTrigger2,
    LTrigger,
    RTrigger,
    Stop,
    Play,
    Home,
    Unknown(u8),
}

impl ButtonId {
    pub fn from_number(number: u8) -> Self {
        match number {
            0 => Self::Square,
            1 => Self::X,
            2 => Self::O,
            3 => Self::Triangle,
            4 => Self::LTrigger2,
            5 => Self::RTrigger2,
            6 => Self::LTrigger,
            7 => Self::RTrigger,
            8 => Self::Stop,
            9 => Self::Play,
            12 => Self::Home,
            n => Self::Unknown(n),
        }
    }
}

/// A decoded event from one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsEvent {
    Init,
    Button { id: ButtonId, pressed: bool },
    Axis { id: AxisId, value: i16 },
}

/// Raw joystick record as delivered by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsRecord {
    pub time: u32,
    pub value: i16,
    pub kind: u8,
    pub number: u8,
}

impl JsRecord {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let bytes: &[u8; JS_EVENT_SIZE] = bytes
            .try_into()
            .map_err(|_| DecodeError::ShortRecord { len: bytes.len() })?;

        Ok(Self {
            time: u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            value: i16::from_ne_bytes([bytes[4], bytes[5]]),
            kind: bytes[6],
            number: bytes[7],
        })
    }

    pub fn encode(&self) -> [u8; JS_EVENT_SIZE] {
        let mut out = [0u8; JS_EVENT_SIZE];
        out[..4].copy_from_slice(&self.time.to_ne_bytes());
        out[4..6].copy_from_slice(&self.value.to_ne_bytes());
        out[6] = self.kind;
        out[7] = self.number;
        out
    }

    /// Typed events carried by this record, INIT first
    pub fn events(&self) -> Vec<JsEvent> {
        let mut events = Vec::with_capacity(2);
        if self.kind & JS_EVENT_INIT != 0 {
            events.push(JsEvent::Init);
        }
        if self.kind & JS_EVENT_BUTTON != 0 {
            events.push(JsEvent::Button {
                id: ButtonId::from_number(self.number),
                pressed: self.value != 0,
            });
        }
        if self.kind & JS_EVENT_AXIS != 0 {
            events.push(JsEvent::Axis {
                id: AxisId::from_number(self.number),
                value: self.value,
            });
        }
        events
    }
}

/// Decode a raw record straight into its events
pub fn decode_events(bytes: &[u8]) -> Result<Vec<JsEvent>, DecodeError> {
    Ok(JsRecord::decode(bytes)?.events())
}

/// Last known value of every axis and button seen this session
#[derive(Debug, Clone, Default)]
pub struct InputState {
    axes: HashMap<AxisId, i16>,
    buttons: HashMap<ButtonId, bool>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: JsEvent) {
        match event {
            JsEvent::Init => {}
            JsEvent::Button { id, pressed } => {
                self.buttons.insert(id, pressed);
            }
            JsEvent::Axis { id, value } => {
                self.axes.insert(id, value);
            }
        }
    }

    pub fn axis(&self, id: AxisId) -> Option<i16> {
        self.axes.get(&id).copied()
    }

    /// Unseen buttons read as released
    pub fn pressed(&self, id: ButtonId) -> bool {
        self.buttons.get(&id).copied().unwrap_or(false)
    }

    pub fn button(&self, id: ButtonId) -> Option<bool> {
        self.buttons.get(&id).copied()
    }
}

/// Read up to one record, returning how many bytes were filled (short only at EOF)
fn read_record(reader: &mut impl Read, buf: &mut [u8; JS_EVENT_SIZE]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < JS_EVENT_SIZE {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Forward records from `reader` until end of stream or the loop goes away
pub fn pump_records(mut reader: impl Read, tx: UnboundedSender<RawInput>) {
    let mut buf = [0u8; JS_EVENT_SIZE];
    loop {
        match read_record(&mut reader, &mut buf) {
            Ok(0) => {
                info!("Joystick stream ended");
                return;
            }
            Ok(n) => {
                if n < JS_EVENT_SIZE {
                    debug!("Joystick stream ended mid-record ({} bytes)", n);
                }
                if tx.send(RawInput::Joystick(buf[..n].to_vec())).is_err() || n < JS_EVENT_SIZE {
                    return;
                }
            }
            Err(e) => {
                warn!("Joystick read failed: {}", e);
                return;
            }
        }
    }
}

/// Open the joystick device (or stdin for "-") and start the reader thread
pub fn spawn_reader(device: &str, tx: UnboundedSender<RawInput>) -> Result<(), InputError> {
    if device == "-" {
        info!("Reading joystick events from stdin");
        thread::Builder::new()
            .name("joystick".into())
            .spawn(move || pump_records(io::stdin().lock(), tx))?;
    } else {
        let file = File::open(device).map_err(|source| InputError::Open {
            device: device.to_string(),
            source,
        })?;
        info!("Reading joystick events from {}", device);
        thread::Builder::new()
            .name("joystick".into())
            .spawn(move || pump_records(file, tx))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn record(kind: u8, number: u8, value: i16) -> [u8; JS_EVENT_SIZE] {
        JsRecord {
            time: 1234,
            value,
            kind,
            number,
        }
        .encode()
    }

    #[test]
    fn test_decode_axis_record() {
        let events = decode_events(&record(JS_EVENT_AXIS, 2, -16000)).unwrap();
        assert_eq!(
            events,
            vec![JsEvent::Axis {
                id: AxisId::RightX,
                value: -16000
            }]
        );
    }

    #[test]
    fn test_decode_init_combined_with_button() {
        let events = decode_events(&record(JS_EVENT_INIT | JS_EVENT_BUTTON, 12, 1)).unwrap();
        assert_eq!(
            events,
            vec![
                JsEvent::Init,
                JsEvent::Button {
                    id: ButtonId::Home,
                    pressed: true
                }
            ]
        );
    }

    #[test]
    fn test_unknown_numbers_pass_through() {
        assert_eq!(AxisId::from_number(9), AxisId::Unknown(9));
        assert_eq!(ButtonId::from_number(10), ButtonId::Unknown(10));
        assert_eq!(ButtonId::from_number(11), ButtonId::Unknown(11));

        let mut state = InputState::new();
        for event in decode_events(&record(JS_EVENT_BUTTON, 11, 1)).unwrap() {
            state.apply(event);
        }
        assert!(state.pressed(ButtonId::Unknown(11)));
        assert!(!state.pressed(ButtonId::Home));
    }

    #[test]
    fn test_zero_type_yields_no_events() {
        assert!(decode_events(&record(0, 0, 100)).unwrap().is_empty());
    }

    #[test]
    fn test_short_record_is_error() {
        assert_eq!(
            decode_events(&[1, 2, 3]),
            Err(DecodeError::ShortRecord { len: 3 })
        );
        assert_eq!(
            JsRecord::decode(&[0u8; 9]),
            Err(DecodeError::ShortRecord { len: 9 })
        );
    }

    #[test]
    fn test_state_last_write_wins() {
        let mut state = InputState::new();
        assert_eq!(state.axis(AxisId::LeftX), None);

        state.apply(JsEvent::Axis {
            id: AxisId::LeftX,
            value: 100,
        });
        state.apply(JsEvent::Axis {
            id: AxisId::LeftX,
            value: -5,
        });
        state.apply(JsEvent::Button {
            id: ButtonId::RTrigger,
            pressed: true,
        });
        state.apply(JsEvent::Button {
            id: ButtonId::RTrigger,
            pressed: false,
        });

        assert_eq!(state.axis(AxisId::LeftX), Some(-5));
        assert_eq!(state.button(ButtonId::RTrigger), Some(false));
    }

    #[test]
    fn test_pump_forwards_records_and_trailing_partial() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&record(JS_EVENT_AXIS, 0, 42));
        stream.extend_from_slice(&record(JS_EVENT_BUTTON, 7, 1));
        stream.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let (tx, mut rx) = unbounded_channel();
        pump_records(stream.as_slice(), tx);

        let mut chunks = Vec::new();
        while let Ok(RawInput::Joystick(bytes)) = rx.try_recv() {
            chunks.push(bytes);
        }
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), JS_EVENT_SIZE);
        assert_eq!(chunks[1].len(), JS_EVENT_SIZE);
        assert_eq!(
            decode_events(&chunks[2]),
            Err(DecodeError::ShortRecord { len: 3 })
        );
    }
}
