//! Serial link to the motion microcontroller.

use std::io::Write;
use std::thread;
use std::time::Duration;

use log::{debug, info};
use serialport::{ClearBuffer, SerialPort};

use super::{Result, Transport, frame_line};

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    path: String,
    baud: u32,
}

impl SerialTransport {
    /// Opens the port and wakes the controller.
    ///
    /// The firmware needs a couple of blank lines and some time to boot
    /// after the port opens; anything it printed meanwhile is discarded.
    pub fn open(path: &str, baud: u32, wake_up: Duration, timeout: Duration) -> Result<Self> {
        info!("Opening serial port: {path} at {baud} bps");
        let mut port = serialport::new(path, baud).timeout(timeout).open()?;

        port.write_all(b"\r\n\r\n")?;
        port.flush()?;
        debug!("waiting {wake_up:?} for controller wake-up");
        thread::sleep(wake_up);
        port.clear(ClearBuffer::Input)?;

        Ok(Self {
            port,
            path: path.to_string(),
            baud,
        })
    }
}

impl Transport for SerialTransport {
    fn send_line(&mut self, line: &str) -> Result<()> {
        let framed = frame_line(line)?;
        debug!("-> {}", framed.trim_end());
        self.port.write_all(framed.as_bytes())?;
        self.port.flush()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} @ {} bps", self.path, self.baud)
    }
}
