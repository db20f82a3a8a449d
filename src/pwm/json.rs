// JSON-lines PWM sink for dry runs: {"channel":9,"on":0,"off":1500}

use std::io::Write;

use super::{PwmSink, Result, check_command};
use crate::messages::PwmCommand;

pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PwmSink for JsonLinesSink<W> {
    fn set_pulse(&mut self, channel: u8, on: u16, off: u16) -> Result<()> {
        let cmd = PwmCommand { channel, on, off };
        check_command(&cmd)?;
        serde_json::to_writer(&mut self.out, &cmd)?;
        // Raw-mode terminals need the carriage return
        self.out.write_all(b"\r\n")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_one_object_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.set_pulse(9, 0, 1500).unwrap();
        sink.set_pulse(1, 0, 380).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        assert_eq!(lines.len(), 2);

        let first: PwmCommand = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, PwmCommand::pulse(9, 1500));
        assert_eq!(lines[1], r#"{"channel":1,"on":0,"off":380}"#);
    }
}
