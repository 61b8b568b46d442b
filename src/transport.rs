//! Transports: deliver jog commands to the motion controller.
//!
//! The microcontroller speaks a line protocol: one ASCII command per
//! line, `J<axis><sign><magnitude>`, where axis 0/1/2 is θ/φ/h.
//! Focus has no wire command and stays local.

mod serial;

pub use serial::SerialTransport;

use std::io;

use log::{debug, info};

use crate::model::{Axis, Command};

/// Errors that can occur while sending to the motion controller.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("refusing to send an empty line")]
    EmptyLine,
}

pub type Result<T> = core::result::Result<T, TransportError>;

/// Something that can deliver commands downstream.
///
/// Delivery is fire-and-forget: there is no acknowledgement to wait for.
pub trait Transport {
    /// Sends one raw line. Surrounding whitespace is stripped and a
    /// single `\n` terminator is added.
    fn send_line(&mut self, line: &str) -> Result<()>;

    /// Encodes and sends a jog command. Commands without a wire
    /// encoding are accepted and dropped.
    fn send(&mut self, command: &Command) -> Result<()> {
        match encode_command(command) {
            Some(line) => self.send_line(&line),
            None => {
                debug!("{command} is local-only, nothing sent");
                Ok(())
            }
        }
    }

    /// A short description for status displays.
    fn describe(&self) -> String;
}

/// The wire index of an axis, if it has one.
pub fn axis_index(axis: Axis) -> Option<u8> {
    match axis {
        Axis::Theta => Some(0),
        Axis::Phi => Some(1),
        Axis::H => Some(2),
        Axis::Focus => None,
    }
}

/// Encodes a command as a newline-terminated jog line.
pub fn encode_command(command: &Command) -> Option<String> {
    let index = axis_index(command.axis)?;
    let sign = if command.distance < 0 { '-' } else { '+' };
    Some(format!(
        "J{index}{sign}{}\n",
        command.distance.unsigned_abs()
    ))
}

/// Normalizes a raw line: strips EOL characters and whitespace,
/// then terminates with exactly one `\n`.
pub fn frame_line(line: &str) -> Result<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(TransportError::EmptyLine);
    }
    Ok(format!("{trimmed}\n"))
}

/// Logs lines instead of sending them. Used when no port is configured.
#[derive(Debug, Default)]
pub struct DryRunTransport {
    sent: usize,
}

impl Transport for DryRunTransport {
    fn send_line(&mut self, line: &str) -> Result<()> {
        let framed = frame_line(line)?;
        self.sent += 1;
        info!("dry run: would send {:?}", framed);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("dry run ({} lines)", self.sent)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingTransport;
    use super::*;

    fn cmd(axis: Axis, distance: i32) -> Command {
        Command { axis, distance }
    }

    #[test]
    fn encodes_jog_lines() {
        assert_eq!(
            encode_command(&cmd(Axis::Theta, 100)).as_deref(),
            Some("J0+100\n")
        );
        assert_eq!(
            encode_command(&cmd(Axis::Phi, -1000)).as_deref(),
            Some("J1-1000\n")
        );
        assert_eq!(
            encode_command(&cmd(Axis::H, 100)).as_deref(),
            Some("J2+100\n")
        );
    }

    #[test]
    fn focus_has_no_wire_form() {
        assert_eq!(encode_command(&cmd(Axis::Focus, 1)), None);
    }

    #[test]
    fn extreme_negative_distance_encodes_magnitude() {
        assert_eq!(
            encode_command(&cmd(Axis::H, i32::MIN)).as_deref(),
            Some("J2-2147483648\n")
        );
    }

    #[test]
    fn frame_line_strips_eol() {
        assert_eq!(frame_line("  J0+5\r\n").unwrap(), "J0+5\n");
        assert!(matches!(
            frame_line("\r\n"),
            Err(TransportError::EmptyLine)
        ));
    }

    #[test]
    fn send_skips_focus() {
        let mut t = RecordingTransport::default();
        t.send(&cmd(Axis::Focus, -1)).unwrap();
        t.send(&cmd(Axis::Theta, -1)).unwrap();
        assert_eq!(*t.lines.borrow(), ["J0-1\n"]);
    }

    #[test]
    fn dry_run_counts_lines() {
        let mut t = DryRunTransport::default();
        t.send(&cmd(Axis::Phi, 1)).unwrap();
        assert_eq!(t.describe(), "dry run (1 lines)");
    }
}
