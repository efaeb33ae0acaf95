//! Error types for link and protocol handling.
//!
//! Every failure the charge-controller link can produce is a [`LinkError`].
//! None of them are fatal: the session treats I/O and open failures as a
//! signal to recover, and malformed frames are logged and dropped.
//!
//! ## Error Categories
//!
//! - **I/O Errors**: a read or write on an open link failed
//! - **Open Errors**: the serial port could not be opened or probed
//! - **Frame Errors**: a frame was too short to decode
//! - **State Errors**: an operation needed a link while none was open
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use esmart3::LinkError;
//!
//! let error = LinkError::open_failed("/dev/ttyUSB0", 38400, "probe returned no data");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type alias for link operations.
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

/// Main error type for link and protocol operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LinkError {
    #[error("Serial I/O failed during {operation}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open {port} at {baud_rate} baud: {reason}")]
    Open {
        port: String,
        baud_rate: u32,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Malformed frame: {length} bytes, need at least {required}")]
    MalformedFrame { length: usize, required: usize },

    #[error("Link is not connected")]
    NotConnected,
}

impl LinkError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            LinkError::Io { .. } => true,
            LinkError::Open { .. } => true,
            LinkError::MalformedFrame { .. } => false,
            LinkError::NotConnected => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LinkError::Io { .. } => vec![
                "Check the USB-serial adapter is still attached",
                "Inspect the RS485 wiring to the controller",
                "Let the session reconnect automatically",
            ],
            LinkError::Open { .. } => vec![
                "Verify the serial port path exists",
                "Check permissions on the serial device",
                "Ensure no other process holds the port",
                "Confirm the controller is powered",
            ],
            LinkError::MalformedFrame { .. } => vec![
                "Check for electrical noise on the line",
                "Verify the controller firmware speaks the eSmart3 protocol",
            ],
            LinkError::NotConnected => {
                vec!["Call connect() before ticking the session", "Wait for recovery to finish"]
            }
        }
    }

    /// Helper constructor for I/O failures on an open link.
    pub fn io(operation: &'static str, source: std::io::Error) -> Self {
        LinkError::Io { operation, source }
    }

    /// Helper constructor for open failures without an underlying error.
    pub fn open_failed(port: impl Into<String>, baud_rate: u32, reason: impl Into<String>) -> Self {
        LinkError::Open { port: port.into(), baud_rate, reason: reason.into(), source: None }
    }

    /// Helper constructor for open failures with source.
    pub fn open_failed_with_source(
        port: impl Into<String>,
        baud_rate: u32,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        LinkError::Open {
            port: port.into(),
            baud_rate,
            reason: source.to_string(),
            source: Some(source),
        }
    }

    /// Helper constructor for frames too short to decode.
    pub fn malformed_frame(length: usize, required: usize) -> Self {
        LinkError::MalformedFrame { length, required }
    }
}
