// Serial link to the PWM bridge board
//
// Packet format: [0xFF, 0xFF, Instruction, Length, Params..., Checksum]
// Length counts params + checksum; checksum is !sum(instruction..params).
// The bridge does not answer, so writes are fire-and-forget.

use serialport::{self, SerialPort};
use std::io::Write;
use tracing::{debug, info};

use super::{PwmSink, Result, check_command};
use crate::config::{PWM_BAUDRATE, PWM_WRITE_TIMEOUT};
use crate::messages::PwmCommand;

/// Packet header bytes
const HEADER: [u8; 2] = [0xFF, 0xFF];

/// Instruction set of the bridge
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    SetFrequency = 0x01,
    SetPulse = 0x02,
}

pub struct SerialPwmBus {
    port: Box<dyn SerialPort>,
}

impl SerialPwmBus {
    /// Open the bridge with the default baudrate
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, PWM_BAUDRATE)
    }

    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        info!("Opening PWM bridge on {} @ {} baud", port_name, baudrate);
        let port = serialport::new(port_name, baudrate)
            .timeout(PWM_WRITE_TIMEOUT)
            .open()?;

        Ok(Self { port })
    }

    /// Calculate checksum for a packet (excluding header)
    fn checksum(data: &[u8]) -> u8 {
        let sum: u16 = data.iter().map(|&b| b as u16).sum();
        (!sum & 0xFF) as u8
    }

    /// Build a packet with header and checksum
    fn build_packet(instruction: Instruction, params: &[u8]) -> Vec<u8> {
        let length = (params.len() + 1) as u8; // params + checksum
        let mut packet = Vec::with_capacity(5 + params.len());

        packet.extend_from_slice(&HEADER);
        packet.push(instruction as u8);
        packet.push(length);
        packet.extend_from_slice(params);

        let checksum_data = &packet[2..]; // skip header
        packet.push(Self::checksum(checksum_data));

        packet
    }

    fn pulse_packet(cmd: &PwmCommand) -> Vec<u8> {
        let [on_lo, on_hi] = cmd.on.to_le_bytes();
        let [off_lo, off_hi] = cmd.off.to_le_bytes();
        Self::build_packet(
            Instruction::SetPulse,
            &[cmd.channel, on_lo, on_hi, off_lo, off_hi],
        )
    }

    fn send_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.port.write_all(packet)?;
        self.port.flush()?;
        Ok(())
    }

    /// Set the PWM output frequency of every channel
    pub fn set_frequency(&mut self, hz: u16) -> Result<()> {
        info!("Setting PWM frequency to {} Hz", hz);
        let packet = Self::build_packet(Instruction::SetFrequency, &hz.to_le_bytes());
        self.send_packet(&packet)
    }
}

impl PwmSink for SerialPwmBus {
    fn set_pulse(&mut self, channel: u8, on: u16, off: u16) -> Result<()> {
        let cmd = PwmCommand { channel, on, off };
        check_command(&cmd)?;
        debug!("Set pin {} to {}", channel, off);
        let packet = Self::pulse_packet(&cmd);
        self.send_packet(&packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        // ~(2+6+9+0+0+0xDC+0x05) = ~242 = 13
        let data = [2u8, 6, 9, 0, 0, 0xDC, 0x05];
        assert_eq!(SerialPwmBus::checksum(&data), 13);
    }

    #[test]
    fn test_pulse_packet() {
        let packet = SerialPwmBus::pulse_packet(&PwmCommand::pulse(9, 1500));
        // Header (2) + Instruction (1) + Length (1) + Params (5) + Checksum (1)
        assert_eq!(packet.len(), 10);
        assert_eq!(&packet[..2], &HEADER);
        assert_eq!(packet[2], Instruction::SetPulse as u8);
        assert_eq!(packet[3], 6);
        assert_eq!(packet[4], 9); // channel
        assert_eq!(&packet[5..7], &[0, 0]); // on
        assert_eq!(u16::from_le_bytes([packet[7], packet[8]]), 1500);
        assert_eq!(packet[9], SerialPwmBus::checksum(&packet[2..9]));
    }

    #[test]
    fn test_frequency_packet() {
        let packet = SerialPwmBus::build_packet(Instruction::SetFrequency, &60u16.to_le_bytes());
        assert_eq!(packet, vec![0xFF, 0xFF, 0x01, 3, 60, 0, !(0x01u8 + 3 + 60)]);
    }
}
