// PWM output: the single exclusively-owned actuator sink
//
// Everything the control loop does ends up as (channel, on, off) pulse
// commands. Sinks:
// - SerialPwmBus: framed serial link to a PWM bridge board
// - JsonLinesSink: one JSON object per command (simulation / piping)
// - RecordingSink: keeps every command in memory

mod json;
pub mod serial;

use crate::config::{PWM_CHANNELS, PWM_TICK_MAX};
use crate::messages::PwmCommand;

pub use json::JsonLinesSink;
pub use serial::SerialPwmBus;

/// Error types for PWM output
#[derive(Debug, thiserror::Error)]
pub enum PwmError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PWM channel {channel} out of range")]
    ChannelOutOfRange { channel: u8 },

    #[error("Pulse tick {tick} out of range on channel {channel}")]
    TickOutOfRange { channel: u8, tick: u16 },
}

pub type Result<T> = std::result::Result<T, PwmError>;

/// Accepts pulse-width commands for the PWM channels
pub trait PwmSink {
    fn set_pulse(&mut self, channel: u8, on: u16, off: u16) -> Result<()>;

    fn send(&mut self, cmd: PwmCommand) -> Result<()> {
        self.set_pulse(cmd.channel, cmd.on, cmd.off)
    }
}

impl<S: PwmSink + ?Sized> PwmSink for Box<S> {
    fn set_pulse(&mut self, channel: u8, on: u16, off: u16) -> Result<()> {
        (**self).set_pulse(channel, on, off)
    }
}

/// Reject commands the bridge cannot represent
pub fn check_command(cmd: &PwmCommand) -> Result<()> {
    if cmd.channel >= PWM_CHANNELS {
        return Err(PwmError::ChannelOutOfRange {
            channel: cmd.channel,
        });
    }
    for tick in [cmd.on, cmd.off] {
        if tick > PWM_TICK_MAX {
            return Err(PwmError::TickOutOfRange {
                channel: cmd.channel,
                tick,
            });
        }
    }
    Ok(())
}

/// Keeps every command it is sent
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    commands: Vec<PwmCommand>,
}

impl RecordingSink {
    pub fn commands(&self) -> &[PwmCommand] {
        &self.commands
    }

    /// Most recent pulse width sent to a channel
    pub fn last_off(&self, channel: u8) -> Option<u16> {
        self.commands
            .iter()
            .rev()
            .find(|c| c.channel == channel)
            .map(|c| c.off)
    }
}

impl PwmSink for RecordingSink {
    fn set_pulse(&mut self, channel: u8, on: u16, off: u16) -> Result<()> {
        let cmd = PwmCommand { channel, on, off };
        check_command(&cmd)?;
        self.commands.push(cmd);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_command_bounds() {
        assert!(check_command(&PwmCommand::pulse(15, 4095)).is_ok());
        assert!(matches!(
            check_command(&PwmCommand::pulse(16, 0)),
            Err(PwmError::ChannelOutOfRange { channel: 16 })
        ));
        assert!(matches!(
            check_command(&PwmCommand::pulse(3, 4096)),
            Err(PwmError::TickOutOfRange {
                channel: 3,
                tick: 4096
            })
        ));
    }

    #[test]
    fn test_recording_sink_tracks_latest() {
        let mut sink = RecordingSink::default();
        sink.set_pulse(2, 0, 320).unwrap();
        sink.send(PwmCommand::pulse(2, 360)).unwrap();
        sink.set_pulse(9, 0, 10).unwrap();

        assert_eq!(sink.commands().len(), 3);
        assert_eq!(sink.last_off(2), Some(360));
        assert_eq!(sink.last_off(0), None);
        assert!(sink.set_pulse(40, 0, 0).is_err());
        assert_eq!(sink.commands().len(), 3);
    }
}
