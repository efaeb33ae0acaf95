//! Test doubles for the link, opener and clock, plus telemetry frame builders
//!
//! These are shared by the unit tests and the benchmarks. Scripted links and
//! openers are cheap handles over shared state, so a test can keep a clone to
//! queue more input or inspect what the session wrote after handing the
//! original to a [`LinkSession`](crate::LinkSession).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::link::{Link, LinkOpener, LinkSettings};
use crate::protocol::{MPPT_SOURCE_ID, PRIMARY_TELEMETRY, encode_frame};
use crate::types::Frame;
use crate::{LinkError, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn broken_pipe() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "scripted link failure")
}

/// Clock that only moves when told to; `sleep` advances it instantly.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
    slept: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: Arc::new(Mutex::new(Instant::now())), slept: Arc::default() }
    }

    pub fn advance(&self, duration: Duration) {
        *lock(&self.now) += duration;
    }

    /// Total time spent in `sleep`.
    pub fn slept(&self) -> Duration {
        *lock(&self.slept)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *lock(&self.now)
    }

    fn sleep(&self, duration: Duration) {
        *lock(&self.slept) += duration;
        self.advance(duration);
    }
}

#[derive(Debug)]
enum ReadStep {
    Data(Vec<u8>),
    Fail,
}

#[derive(Debug, Default)]
struct LinkScript {
    reads: VecDeque<ReadStep>,
    written: Vec<Vec<u8>>,
    fail_writes: bool,
}

/// In-memory link fed from a queue of scripted reads.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLink {
    inner: Arc<Mutex<LinkScript>>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link with `bytes` already waiting to be read.
    pub fn with_data(bytes: impl Into<Vec<u8>>) -> Self {
        let link = Self::new();
        link.queue_data(bytes);
        link
    }

    pub fn queue_data(&self, bytes: impl Into<Vec<u8>>) {
        lock(&self.inner).reads.push_back(ReadStep::Data(bytes.into()));
    }

    /// The next availability check or read fails with an I/O error.
    pub fn queue_failure(&self) {
        lock(&self.inner).reads.push_back(ReadStep::Fail);
    }

    pub fn fail_writes(&self, fail: bool) {
        lock(&self.inner).fail_writes = fail;
    }

    /// Every successful write, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.inner).written.clone()
    }
}

impl Link for ScriptedLink {
    fn bytes_available(&mut self) -> std::io::Result<usize> {
        match lock(&self.inner).reads.front() {
            Some(ReadStep::Data(bytes)) => Ok(bytes.len()),
            Some(ReadStep::Fail) => Err(broken_pipe()),
            None => Ok(0),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut script = lock(&self.inner);
        match script.reads.pop_front() {
            Some(ReadStep::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    script.reads.push_front(ReadStep::Data(bytes.split_off(n)));
                }
                Ok(n)
            }
            Some(ReadStep::Fail) => Err(broken_pipe()),
            None => Ok(0),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let mut script = lock(&self.inner);
        if script.fail_writes {
            return Err(broken_pipe());
        }
        script.written.push(bytes.to_vec());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct OpenerScript {
    outcomes: VecDeque<Option<ScriptedLink>>,
    opened: Vec<LinkSettings>,
}

/// Opener that hands out queued links; once the queue is empty every open fails.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOpener {
    inner: Arc<Mutex<OpenerScript>>,
}

impl ScriptedOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next open succeeds with `link`.
    pub fn queue_link(&self, link: ScriptedLink) {
        lock(&self.inner).outcomes.push_back(Some(link));
    }

    /// The next open fails.
    pub fn queue_failure(&self) {
        lock(&self.inner).outcomes.push_back(None);
    }

    /// Settings of every open attempt, in order.
    pub fn opened(&self) -> Vec<LinkSettings> {
        lock(&self.inner).opened.clone()
    }
}

impl LinkOpener for ScriptedOpener {
    type Link = ScriptedLink;

    fn open(&mut self, settings: &LinkSettings) -> Result<ScriptedLink> {
        let mut script = lock(&self.inner);
        script.opened.push(settings.clone());
        script.outcomes.pop_front().flatten().ok_or_else(|| {
            LinkError::open_failed(settings.port.as_str(), settings.baud_rate, "scripted failure")
        })
    }
}

/// Raw field values of a primary telemetry payload, before scaling.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryPayload {
    pub charge_mode: u16,
    pub pv_voltage: u16,
    pub battery_voltage: u16,
    pub charge_current: u16,
    pub load_voltage: u16,
    pub load_current: u16,
    pub charge_power: u16,
    pub load_power: u16,
    pub battery_temp: u8,
    pub internal_temp: u8,
    pub state_of_charge: u8,
    pub co2_grams: u16,
}

impl TelemetryPayload {
    /// Payload bytes laid out at the decoder's field offsets.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut payload = vec![0u8; 30];
        let mut put = |offset: usize, value: u16| {
            payload[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        };
        put(2, self.charge_mode);
        put(4, self.pv_voltage);
        put(6, self.battery_voltage);
        put(8, self.charge_current);
        put(12, self.load_voltage);
        put(14, self.load_current);
        put(16, self.charge_power);
        put(18, self.load_power);
        put(28, self.co2_grams);
        payload[20] = self.battery_temp;
        payload[22] = self.internal_temp;
        payload[24] = self.state_of_charge;
        payload
    }
}

/// Full wire bytes of a primary telemetry frame, marker included.
pub fn telemetry_wire(payload: &TelemetryPayload) -> Vec<u8> {
    encode_frame(0x0101, MPPT_SOURCE_ID, PRIMARY_TELEMETRY, &payload.to_bytes())
}

/// Assembled (post-marker) primary telemetry frame.
pub fn telemetry_frame(payload: &TelemetryPayload) -> Frame {
    Frame::new(telemetry_wire(payload)[1..].to_vec())
}
