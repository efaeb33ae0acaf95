//! Link session: read/poll tick and reconnection
//!
//! A [`LinkSession`] owns the serial link, the frame assembler and the poll
//! timer. Callers drive it by calling [`LinkSession::tick`] on a short fixed
//! interval. Each tick drains pending input through the assembler and decoder,
//! hands telemetry records to the registered sink, and sends a poll request
//! once the poll interval has elapsed.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ connect ┌───────────┐ I/O failure ┌────────────┐
//! │ Disconnected │────────>│ Connected │────────────>│ Recovering │
//! └──────────────┘         └───────────┘<────────────└────────────┘
//!                                         probe data
//! ```
//!
//! Recovery reopens the port at the recovery baud rate with non-blocking
//! reads and waits for a probe read to return data. It retries forever.
//! While recovering, [`tick`](LinkSession::tick) blocks.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::link::{Link, LinkOpener};
use crate::protocol::{Command, Decoded, FrameAssembler, decode};
use crate::types::TelemetryRecord;
use crate::{LinkError, Result};

/// Receives decoded telemetry records, one call per primary telemetry frame.
///
/// Any `FnMut(TelemetryRecord) + Send` closure is a sink.
pub trait TelemetrySink: Send {
    fn on_record(&mut self, record: TelemetryRecord);
}

impl<F> TelemetrySink for F
where
    F: FnMut(TelemetryRecord) + Send,
{
    fn on_record(&mut self, record: TelemetryRecord) {
        self(record)
    }
}

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkState {
    /// No link open; call [`LinkSession::connect`]
    Disconnected,
    Connected,
    /// The link failed and is being reopened
    Recovering,
}

/// What one tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Frames assembled
    pub frames: usize,
    /// Telemetry records delivered to the sink
    pub records: usize,
    /// Whether a poll request was sent
    pub polled: bool,
    /// Whether the tick ran link recovery
    pub recovered: bool,
}

/// Owns the serial link to one charge controller.
pub struct LinkSession<O: LinkOpener, C: Clock = SystemClock> {
    opener: O,
    clock: C,
    port: String,
    config: SessionConfig,
    link: Option<O::Link>,
    state: LinkState,
    assembler: FrameAssembler,
    last_poll: Instant,
    last_rx: Instant,
    sink: Option<Box<dyn TelemetrySink>>,
    recovery_attempts: u64,
}

impl<O: LinkOpener, C: Clock> LinkSession<O, C> {
    /// Create a disconnected session for `port`.
    ///
    /// The poll timer starts now: the first poll goes out one poll interval
    /// after creation.
    pub fn new(opener: O, clock: C, port: impl Into<String>, config: SessionConfig) -> Self {
        let now = clock.now();
        Self {
            opener,
            clock,
            port: port.into(),
            config,
            link: None,
            state: LinkState::Disconnected,
            assembler: FrameAssembler::new(),
            last_poll: now,
            last_rx: now,
            sink: None,
            recovery_attempts: 0,
        }
    }

    /// Open the link at the primary rate.
    pub fn connect(&mut self) -> Result<()> {
        let settings = self.config.primary_settings(&self.port);
        let link = self.opener.open(&settings)?;

        self.link = Some(link);
        self.assembler.reset();
        self.state = LinkState::Connected;

        info!(port = %self.port, baud_rate = settings.baud_rate, "Connected to charge controller");
        Ok(())
    }

    /// Close the link without recovering.
    pub fn disconnect(&mut self) {
        if self.link.take().is_some() {
            info!(port = %self.port, "Disconnected from charge controller");
        }
        self.assembler.reset();
        self.state = LinkState::Disconnected;
    }

    /// Register the sink for decoded records, replacing any previous one.
    pub fn set_sink<S: TelemetrySink + 'static>(&mut self, sink: S) {
        self.sink = Some(Box::new(sink));
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Bytes of the frame currently being assembled.
    pub fn pending_frame_len(&self) -> usize {
        self.assembler.pending_len()
    }

    /// Run one tick, recovering inline if the link fails.
    ///
    /// Never fails: I/O errors are logged and answered with
    /// [`recover`](Self::recover), which blocks until the link is back.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        match self.state {
            LinkState::Disconnected => {
                debug!(port = %self.port, "Tick on disconnected session ignored");
                return report;
            }
            LinkState::Recovering => {
                self.recover();
                report.recovered = true;
                return report;
            }
            LinkState::Connected => {}
        }

        if self.exchange(&mut report).is_err() {
            self.recover();
            report.recovered = true;
        }
        report
    }

    /// Run one tick without recovering.
    ///
    /// On I/O failure the link is closed, the session moves to
    /// [`LinkState::Recovering`] and the error is returned.
    pub fn service(&mut self) -> Result<TickReport> {
        if self.link.is_none() {
            return Err(LinkError::NotConnected);
        }

        let mut report = TickReport::default();
        self.exchange(&mut report)?;
        Ok(report)
    }

    /// Write a fixed command to the controller.
    pub fn send_command(&mut self, command: Command) -> Result<()> {
        let result = self.write(command);
        if let Err(error @ LinkError::Io { .. }) = &result {
            self.fail(error);
        }
        result
    }

    /// Switch the controller's load output.
    pub fn set_load(&mut self, on: bool) -> Result<()> {
        self.send_command(if on { Command::LoadOn } else { Command::LoadOff })
    }

    /// Reopen the link, retrying until a probe read returns data.
    ///
    /// Blocks the caller for as long as the controller stays unreachable.
    pub fn recover(&mut self) {
        warn!(port = %self.port, "Serial link lost, reconnecting");

        loop {
            match self.try_recover_once() {
                Ok(()) => return,
                Err(e) => {
                    warn!(
                        port = %self.port,
                        attempt = self.recovery_attempts,
                        error = %e,
                        "Reconnect attempt failed"
                    );
                    self.sleep_retry_delay();
                }
            }
        }
    }

    /// Wait out `retry_delay` on the session's clock.
    pub fn sleep_retry_delay(&self) {
        self.clock.sleep(self.config.retry_delay);
    }

    /// Make a single recovery attempt.
    ///
    /// Closes any open link, reopens at the recovery rate, waits for the port
    /// to settle and probes it. Success leaves the session connected, by
    /// default still at the recovery rate, with an empty frame buffer.
    pub fn try_recover_once(&mut self) -> Result<()> {
        self.link = None;
        self.state = LinkState::Recovering;
        self.recovery_attempts += 1;

        let settings = self.config.recovery_settings(&self.port);
        let mut link = self.opener.open(&settings)?;

        self.clock.sleep(self.config.probe_settle);

        let mut probe = vec![0u8; self.config.probe_len.max(1)];
        let received = link.read(&mut probe).map_err(|e| {
            LinkError::open_failed_with_source(self.port.as_str(), settings.baud_rate, Box::new(e))
        })?;
        if received == 0 {
            return Err(LinkError::open_failed(
                self.port.as_str(),
                settings.baud_rate,
                "probe read returned no data",
            ));
        }
        trace!(bytes = received, "Probe read succeeded, discarding probe bytes");

        let mut baud_rate = settings.baud_rate;
        if self.config.reopen_at_primary_rate {
            drop(link);
            let primary = self.config.primary_settings(&self.port);
            link = self.opener.open(&primary)?;
            baud_rate = primary.baud_rate;
        }

        self.link = Some(link);
        self.assembler.reset();
        self.last_rx = self.clock.now();
        self.state = LinkState::Connected;

        info!(
            port = %self.port,
            baud_rate,
            attempts = self.recovery_attempts,
            "Serial link recovered"
        );
        self.recovery_attempts = 0;
        Ok(())
    }

    fn exchange(&mut self, report: &mut TickReport) -> Result<()> {
        let result = self.drain_and_poll(report);
        if let Err(error) = &result {
            self.fail(error);
        }
        result
    }

    fn drain_and_poll(&mut self, report: &mut TickReport) -> Result<()> {
        let mut chunk = vec![0u8; self.config.read_chunk.max(1)];

        loop {
            let link = self.link.as_mut().ok_or(LinkError::NotConnected)?;
            let available =
                link.bytes_available().map_err(|e| LinkError::io("availability check", e))?;
            if available == 0 {
                break;
            }

            let n = link.read(&mut chunk).map_err(|e| LinkError::io("read", e))?;
            if n == 0 {
                break;
            }

            self.last_rx = self.clock.now();
            self.ingest(&chunk[..n], report);
        }

        self.expire_stalled_frame();

        let now = self.clock.now();
        if now.duration_since(self.last_poll) >= self.config.poll_interval {
            self.write(Command::Poll)?;
            self.last_poll = now;
            report.polled = true;
        }

        Ok(())
    }

    fn ingest(&mut self, bytes: &[u8], report: &mut TickReport) {
        for frame in self.assembler.feed(bytes) {
            report.frames += 1;

            if self.config.verify_checksum && !frame.checksum_ok() {
                debug!(len = frame.len(), trailer = ?frame.trailer(), "Dropping frame with bad checksum");
                continue;
            }

            match decode(&frame) {
                Ok(Decoded::Telemetry(record)) => {
                    report.records += 1;
                    trace!(
                        mode = %record.charge_mode,
                        pv_voltage = record.pv_voltage,
                        battery_voltage = record.battery_voltage,
                        "Telemetry decoded"
                    );
                    match self.sink.as_mut() {
                        Some(sink) => sink.on_record(record),
                        None => trace!("No sink registered, record dropped"),
                    }
                }
                Ok(Decoded::Unrecognized { source_id, msg_type }) => {
                    trace!(source_id, msg_type, "Ignoring unrecognized frame");
                }
                Err(e) => {
                    warn!(error = %e, "Dropping malformed frame");
                }
            }
        }
    }

    fn expire_stalled_frame(&mut self) {
        let Some(timeout) = self.config.stall_timeout else {
            return;
        };
        if self.assembler.is_accumulating()
            && self.clock.now().duration_since(self.last_rx) >= timeout
        {
            debug!(pending = self.assembler.pending_len(), "Discarding stalled partial frame");
            self.assembler.reset();
        }
    }

    fn write(&mut self, command: Command) -> Result<()> {
        let link = self.link.as_mut().ok_or(LinkError::NotConnected)?;
        link.write_all(command.as_bytes()).map_err(|e| LinkError::io("write", e))?;
        debug!(?command, "Command sent");
        Ok(())
    }

    fn fail(&mut self, error: &LinkError) {
        self.link = None;
        self.state = LinkState::Recovering;
        warn!(port = %self.port, error = %error, "Serial link failed");
    }
}
