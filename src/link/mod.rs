//! Physical link abstraction
//!
//! A [`LinkOpener`] produces [`Link`]s for a given [`LinkSettings`]. Closing
//! a link is dropping it. The session only ever holds one link at a time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;

mod serial;

pub use serial::{SerialLink, SerialOpener};

/// Baud rate for normal operation.
pub const PRIMARY_BAUD: u32 = 9600;

/// Read timeout for normal operation.
pub const PRIMARY_TIMEOUT: Duration = Duration::from_millis(100);

/// Baud rate used while probing during recovery.
pub const RECOVERY_BAUD: u32 = 38400;

/// How to open the serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSettings {
    /// Device path, e.g. `/dev/ttyUSB0`
    pub port: String,
    pub baud_rate: u32,
    /// Read timeout; zero means reads return immediately
    pub timeout: Duration,
}

impl LinkSettings {
    /// Settings for normal operation: 9600 baud, 100 ms read timeout.
    pub fn primary(port: impl Into<String>) -> Self {
        Self { port: port.into(), baud_rate: PRIMARY_BAUD, timeout: PRIMARY_TIMEOUT }
    }

    /// Settings for recovery probing: 38400 baud, non-blocking reads.
    pub fn recovery(port: impl Into<String>) -> Self {
        Self { port: port.into(), baud_rate: RECOVERY_BAUD, timeout: Duration::ZERO }
    }
}

/// An open byte-oriented link.
pub trait Link: Send {
    /// Bytes waiting in the receive buffer.
    fn bytes_available(&mut self) -> std::io::Result<usize>;

    /// Read into `buf`, returning the number of bytes read.
    ///
    /// A read that times out without data returns `Ok(0)`.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()>;
}

/// Opens links; implementations report failures as [`LinkError::Open`](crate::LinkError::Open).
pub trait LinkOpener: Send {
    type Link: Link;

    fn open(&mut self, settings: &LinkSettings) -> Result<Self::Link>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_use_fixed_rates() {
        let primary = LinkSettings::primary("/dev/ttyUSB0");
        assert_eq!(primary.baud_rate, 9600);
        assert_eq!(primary.timeout, Duration::from_millis(100));

        let recovery = LinkSettings::recovery("/dev/ttyUSB0");
        assert_eq!(recovery.baud_rate, 38400);
        assert_eq!(recovery.timeout, Duration::ZERO);
        assert_eq!(recovery.port, primary.port);
    }
}
