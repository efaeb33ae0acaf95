//! Follow a controller from async code
//!
//! Usage: cargo run --example feed_stream -- /dev/ttyUSB0
//!
//! Prints records as they arrive and stops on Ctrl-C.

use esmart3::{Esmart, SessionConfig, TelemetryFeed};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let port = std::env::args().nth(1).unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let feed = TelemetryFeed::spawn_default(Esmart::session(&port, SessionConfig::default()));

    let mut records = Box::pin(feed.subscribe());
    let mut states = Box::pin(feed.state_changes());

    loop {
        tokio::select! {
            Some(record) = records.next() => {
                println!(
                    "{} | PV {:.1} V | battery {:.1} V {}%",
                    record.charge_mode, record.pv_voltage, record.battery_voltage, record.state_of_charge
                );
            }
            Some(state) = states.next() => {
                tracing::info!(?state, "Link state changed");
            }
            _ = tokio::signal::ctrl_c() => break,
            else => break,
        }
    }

    feed.shutdown().await;
    Ok(())
}
