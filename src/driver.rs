//! Async feed over a blocking link session
//!
//! [`TelemetryFeed`] moves a [`LinkSession`] onto a tokio blocking task and
//! ticks it on a fixed interval. Decoded records and link state changes are
//! republished through watch channels, so async consumers (a display, a
//! metrics writer) can follow the controller without owning the serial port.
//!
//! Recovery runs one attempt per loop iteration, which lets the feed observe
//! cancellation between attempts instead of blocking inside
//! [`LinkSession::recover`].

use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::link::LinkOpener;
use crate::session::{LinkSession, LinkState};
use crate::types::TelemetryRecord;

/// Tick cadence used by [`TelemetryFeed::spawn_default`].
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Handle to a session running on a background task.
///
/// Dropping the handle cancels the task; [`shutdown`](Self::shutdown) also
/// waits for it to release the port.
pub struct TelemetryFeed {
    /// Latest decoded record
    records: watch::Receiver<Option<TelemetryRecord>>,

    /// Current link state
    states: watch::Receiver<LinkState>,

    /// Cancellation token for stopping the task
    cancel: CancellationToken,

    task: Option<JoinHandle<()>>,
}

impl TelemetryFeed {
    /// Spawn the feed with [`DEFAULT_TICK_INTERVAL`].
    pub fn spawn_default<O, C>(session: LinkSession<O, C>) -> Self
    where
        O: LinkOpener + 'static,
        C: Clock + 'static,
    {
        Self::spawn(session, DEFAULT_TICK_INTERVAL)
    }

    /// Move `session` onto a blocking task and tick it every `tick_interval`.
    ///
    /// A disconnected session is connected by the task, retrying with the
    /// session's retry delay. The session's sink is replaced by the feed.
    /// Must be called from within a tokio runtime.
    pub fn spawn<O, C>(mut session: LinkSession<O, C>, tick_interval: Duration) -> Self
    where
        O: LinkOpener + 'static,
        C: Clock + 'static,
    {
        let (record_tx, record_rx) = watch::channel(None);
        let (state_tx, state_rx) = watch::channel(session.state());
        let cancel = CancellationToken::new();

        session.set_sink(move |record: TelemetryRecord| {
            // Receivers only go away when the feed itself is dropped
            let _ = record_tx.send(Some(record));
        });

        let cancel_task = cancel.clone();
        let task = tokio::task::spawn_blocking(move || {
            Self::run(session, tick_interval, state_tx, cancel_task);
        });

        Self { records: record_rx, states: state_rx, cancel, task: Some(task) }
    }

    /// Blocking loop that owns the session.
    fn run<O, C>(
        mut session: LinkSession<O, C>,
        tick_interval: Duration,
        state_tx: watch::Sender<LinkState>,
        cancel: CancellationToken,
    ) where
        O: LinkOpener,
        C: Clock,
    {
        info!(port = %session.port(), "Telemetry feed started");
        let mut record_count = 0u64;

        while !cancel.is_cancelled() {
            match session.state() {
                LinkState::Connected => match session.service() {
                    Ok(report) => record_count += report.records as u64,
                    Err(e) => debug!(error = %e, "Tick failed, switching to recovery"),
                },
                LinkState::Recovering => {
                    if let Err(e) = session.try_recover_once() {
                        warn!(port = %session.port(), error = %e, "Reconnect attempt failed");
                        session.sleep_retry_delay();
                    }
                }
                LinkState::Disconnected => {
                    if let Err(e) = session.connect() {
                        warn!(port = %session.port(), error = %e, "Initial connect failed");
                        session.sleep_retry_delay();
                    }
                }
            }

            let state = session.state();
            state_tx.send_if_modified(|current| {
                let changed = *current != state;
                *current = state;
                changed
            });

            std::thread::sleep(tick_interval);
        }

        session.disconnect();
        let _ = state_tx.send(LinkState::Disconnected);
        info!(records = record_count, "Telemetry feed stopped");
    }

    /// Stream of decoded records.
    ///
    /// Yields the latest record immediately if one exists, then each new one.
    /// A slow consumer sees only the most recent record. The stream ends when
    /// the feed stops.
    pub fn subscribe(&self) -> impl Stream<Item = TelemetryRecord> + 'static {
        WatchStream::new(self.records.clone()).filter_map(|opt| async move { opt })
    }

    /// Most recent record, if any has arrived.
    pub fn latest(&self) -> Option<TelemetryRecord> {
        *self.records.borrow()
    }

    pub fn link_state(&self) -> LinkState {
        *self.states.borrow()
    }

    /// Stream of link state changes, starting with the current state.
    pub fn state_changes(&self) -> impl Stream<Item = LinkState> + 'static {
        WatchStream::new(self.states.clone())
    }

    /// Stop the task and wait for it to close the port.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Telemetry feed task panicked");
            }
        }
    }
}

impl Drop for TelemetryFeed {
    fn drop(&mut self) {
        debug!("Dropping telemetry feed");
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::test_utils::{
        ManualClock, ScriptedLink, ScriptedOpener, TelemetryPayload, telemetry_wire,
    };

    const TICK: Duration = Duration::from_millis(2);
    const WAIT: Duration = Duration::from_secs(5);

    const RETRY_DELAY: Duration = Duration::from_millis(250);

    fn session(opener: &ScriptedOpener) -> LinkSession<ScriptedOpener, ManualClock> {
        session_with_clock(opener, ManualClock::new())
    }

    fn session_with_clock(
        opener: &ScriptedOpener,
        clock: ManualClock,
    ) -> LinkSession<ScriptedOpener, ManualClock> {
        let config = SessionConfig { retry_delay: RETRY_DELAY, ..Default::default() };
        LinkSession::new(opener.clone(), clock, "/dev/ttyUSB0", config)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(WAIT, async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn feed_connects_and_publishes_records() {
        let opener = ScriptedOpener::new();
        let payload =
            TelemetryPayload { pv_voltage: 412, state_of_charge: 93, ..Default::default() };
        opener.queue_link(ScriptedLink::with_data(telemetry_wire(&payload)));

        let feed = TelemetryFeed::spawn(session(&opener), TICK);
        let mut records = Box::pin(feed.subscribe());

        let record = tokio::time::timeout(WAIT, records.next())
            .await
            .expect("timed out waiting for record")
            .expect("feed ended early");

        assert_eq!(record.pv_voltage, 41.2);
        assert_eq!(record.state_of_charge, 93);
        assert_eq!(feed.latest(), Some(record));
        assert_eq!(feed.link_state(), LinkState::Connected);

        feed.shutdown().await;
    }

    #[tokio::test]
    async fn feed_recovers_failed_link() {
        let opener = ScriptedOpener::new();
        let link = ScriptedLink::new();
        link.queue_failure();
        opener.queue_link(link);
        opener.queue_failure();
        opener.queue_link(ScriptedLink::with_data(vec![0x00]));

        let feed = TelemetryFeed::spawn(session(&opener), TICK);

        wait_until(|| opener.opened().len() == 3 && feed.link_state() == LinkState::Connected)
            .await;

        let opened = opener.opened();
        assert_eq!(opened[0].baud_rate, 9600);
        assert_eq!(opened[1].baud_rate, 38400);
        assert_eq!(opened[2].baud_rate, 38400);

        feed.shutdown().await;
    }

    #[tokio::test]
    async fn feed_retries_initial_connect() {
        let opener = ScriptedOpener::new();
        opener.queue_failure();
        opener.queue_link(ScriptedLink::new());

        let clock = ManualClock::new();

        let feed = TelemetryFeed::spawn(session_with_clock(&opener, clock.clone()), TICK);

        wait_until(|| feed.link_state() == LinkState::Connected).await;
        assert_eq!(opener.opened().len(), 2);
        assert!(opener.opened().iter().all(|s| s.baud_rate == 9600));
        // The retry wait runs on the session's clock, not the wall clock
        assert_eq!(clock.slept(), RETRY_DELAY);

        feed.shutdown().await;
    }

    #[tokio::test]
    async fn state_changes_follow_failure_and_recovery() {
        let opener = ScriptedOpener::new();
        let link = ScriptedLink::new();
        opener.queue_link(link.clone());
        for _ in 0..20 {
            opener.queue_failure();
        }
        opener.queue_link(ScriptedLink::with_data(vec![0x00]));

        let mut session = session(&opener);
        session.connect().unwrap();
        let feed = TelemetryFeed::spawn(session, TICK);
        let mut states = Box::pin(feed.state_changes());

        let mut seen = vec![tokio::time::timeout(WAIT, states.next()).await.unwrap().unwrap()];
        link.queue_failure();
        while seen.len() < 3 {
            let state = tokio::time::timeout(WAIT, states.next())
                .await
                .expect("timed out waiting for state change")
                .expect("feed ended early");
            seen.push(state);
        }

        assert_eq!(seen, [LinkState::Connected, LinkState::Recovering, LinkState::Connected]);
        assert_eq!(opener.opened().len(), 22);

        feed.shutdown().await;
    }

    #[tokio::test]
    async fn dropping_feed_stops_recovery() {
        let opener = ScriptedOpener::new();
        let link = ScriptedLink::new();
        link.queue_failure();
        opener.queue_link(link);

        let feed = TelemetryFeed::spawn(session(&opener), TICK);
        let states = feed.state_changes();

        wait_until(|| feed.link_state() == LinkState::Recovering && opener.opened().len() >= 3)
            .await;
        drop(feed);

        let states: Vec<_> = tokio::time::timeout(WAIT, states.collect()).await.unwrap();
        assert_eq!(states.last(), Some(&LinkState::Disconnected));

        // The task has exited once the state stream ends; no more reopen attempts follow
        let opens = opener.opened().len();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(opener.opened().len(), opens);
    }

    #[tokio::test]
    async fn shutdown_ends_streams() {
        let opener = ScriptedOpener::new();
        opener.queue_link(ScriptedLink::new());

        let feed = TelemetryFeed::spawn(session(&opener), TICK);
        let records = feed.subscribe();
        let states = feed.state_changes();

        feed.shutdown().await;

        let remaining: Vec<_> = tokio::time::timeout(WAIT, records.collect()).await.unwrap();
        assert!(remaining.is_empty());

        let states: Vec<_> = tokio::time::timeout(WAIT, states.collect()).await.unwrap();
        assert_eq!(states.last(), Some(&LinkState::Disconnected));
    }
}
