//! `serialport`-backed link

use std::io::{Read, Write};

use serialport::SerialPort;
use tracing::{debug, trace};

use super::{Link, LinkOpener, LinkSettings};
use crate::{LinkError, Result};

/// Opens real serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

impl LinkOpener for SerialOpener {
    type Link = SerialLink;

    fn open(&mut self, settings: &LinkSettings) -> Result<SerialLink> {
        trace!(port = %settings.port, baud_rate = settings.baud_rate, "Opening serial port");

        let port = serialport::new(settings.port.as_str(), settings.baud_rate)
            .timeout(settings.timeout)
            .open()
            .map_err(|e| {
                LinkError::open_failed_with_source(
                    settings.port.as_str(),
                    settings.baud_rate,
                    Box::new(e),
                )
            })?;

        debug!(port = %settings.port, baud_rate = settings.baud_rate, "Serial port opened");
        Ok(SerialLink { port })
    }
}

/// An open serial port.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink").field("port", &self.port.name()).finish()
    }
}

impl Link for SerialLink {
    fn bytes_available(&mut self) -> std::io::Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.port.read(buf) {
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            other => other,
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        trace!(port = ?self.port.name(), "Closing serial port");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_port_is_an_open_failure() {
        let settings = LinkSettings::primary("/dev/esmart3-does-not-exist");
        let err = SerialOpener.open(&settings).unwrap_err();

        match err {
            LinkError::Open { port, baud_rate, .. } => {
                assert_eq!(port, "/dev/esmart3-does-not-exist");
                assert_eq!(baud_rate, 9600);
            }
            other => panic!("Expected Open error, got {other:?}"),
        }
    }
}
