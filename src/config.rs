//! Session configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::link::{LinkSettings, PRIMARY_BAUD, PRIMARY_TIMEOUT, RECOVERY_BAUD};

/// Tunables for a [`LinkSession`](crate::LinkSession).
///
/// Defaults match the controller's expected timing. Missing fields fall back
/// to their defaults when deserialized, so callers can embed this in their own
/// configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Time between poll requests
    pub poll_interval: Duration,
    /// Maximum bytes per read during a tick
    pub read_chunk: usize,
    /// Delay after a failed recovery attempt
    pub retry_delay: Duration,
    /// Wait between reopening the port and the probe read
    pub probe_settle: Duration,
    /// Maximum bytes read by the recovery probe
    pub probe_len: usize,
    pub primary_baud: u32,
    pub primary_timeout: Duration,
    pub recovery_baud: u32,
    /// Reopen at the primary rate after a successful probe. Off by default:
    /// the link stays at the recovery rate, as the controller expects.
    pub reopen_at_primary_rate: bool,
    /// Discard a partial frame after this long without new bytes
    pub stall_timeout: Option<Duration>,
    /// Drop frames whose trailer checksum does not match
    pub verify_checksum: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            read_chunk: 100,
            retry_delay: Duration::from_millis(500),
            probe_settle: Duration::from_millis(500),
            probe_len: 100,
            primary_baud: PRIMARY_BAUD,
            primary_timeout: PRIMARY_TIMEOUT,
            recovery_baud: RECOVERY_BAUD,
            reopen_at_primary_rate: false,
            stall_timeout: None,
            verify_checksum: false,
        }
    }
}

impl SessionConfig {
    /// Settings for normal operation on `port`.
    pub fn primary_settings(&self, port: &str) -> LinkSettings {
        LinkSettings {
            baud_rate: self.primary_baud,
            timeout: self.primary_timeout,
            ..LinkSettings::primary(port)
        }
    }

    /// Settings for recovery probing on `port`; reads never block.
    pub fn recovery_settings(&self, port: &str) -> LinkSettings {
        LinkSettings { baud_rate: self.recovery_baud, ..LinkSettings::recovery(port) }
    }
}
