//! Streaming protocol decoder and self-healing serial link for eSmart3 MPPT
//! solar charge controllers.
//!
//! The controller speaks a small binary protocol over RS485/serial. This crate
//! reassembles the byte stream into frames, decodes the primary telemetry
//! frame into a [`TelemetryRecord`], polls the controller on a fixed cadence,
//! and reconnects when the serial link fails.
//!
//! # Features
//!
//! - **Frame assembly**: positional, chunk-boundary independent reassembly
//! - **Typed telemetry**: voltages, currents, powers, temperatures and charge stage
//! - **Recovery**: automatic reopen-and-probe after I/O failures
//! - **Async feed** (`driver` feature): records as a `Stream` for tokio consumers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use esmart3::{Esmart, TelemetryRecord};
//! use std::time::Duration;
//!
//! fn main() -> esmart3::Result<()> {
//!     let mut session = Esmart::open("/dev/ttyUSB0")?;
//!     session.set_sink(|record: TelemetryRecord| {
//!         println!("PV {:.1} V, battery {:.1} V", record.pv_voltage, record.battery_voltage);
//!     });
//!
//!     loop {
//!         session.tick();
//!         std::thread::sleep(Duration::from_millis(50));
//!     }
//! }
//! ```

mod clock;
mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

pub mod link;
pub mod protocol;
pub mod session;

#[cfg(feature = "driver")]
pub mod driver;

// Core exports
pub use clock::{Clock, SystemClock};
pub use config::SessionConfig;
pub use error::*;
pub use types::{ChargeMode, Frame, TelemetryRecord};

// Link and session exports
pub use link::{Link, LinkOpener, LinkSettings, SerialLink, SerialOpener};
pub use protocol::{Command, Decoded, FrameAssembler, decode};
pub use session::{LinkSession, LinkState, TelemetrySink, TickReport};

#[cfg(feature = "driver")]
pub use driver::TelemetryFeed;

/// Entry point for sessions on a real serial port.
///
/// # Examples
///
/// ```rust,no_run
/// use esmart3::{Esmart, SessionConfig};
/// use std::time::Duration;
///
/// # fn main() -> esmart3::Result<()> {
/// let config = SessionConfig { poll_interval: Duration::from_secs(10), ..Default::default() };
/// let session = Esmart::open_with("/dev/ttyUSB0", config)?;
/// # Ok(())
/// # }
/// ```
pub struct Esmart;

impl Esmart {
    /// Open `port` at the primary rate with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Open`] if the port cannot be opened.
    pub fn open(port: &str) -> Result<LinkSession<SerialOpener>> {
        Self::open_with(port, SessionConfig::default())
    }

    /// Open `port` at the primary rate with custom settings.
    pub fn open_with(port: &str, config: SessionConfig) -> Result<LinkSession<SerialOpener>> {
        let mut session = LinkSession::new(SerialOpener, SystemClock, port, config);
        session.connect()?;
        Ok(session)
    }

    /// Disconnected session for `port`.
    ///
    /// Call [`LinkSession::connect`] or hand it to a `TelemetryFeed`, which
    /// connects it from its background task.
    pub fn session(port: &str, config: SessionConfig) -> LinkSession<SerialOpener> {
        LinkSession::new(SerialOpener, SystemClock, port, config)
    }
}
