//! Poll a controller and print every telemetry record
//!
//! Usage: cargo run --example poll_controller -- /dev/ttyUSB0
//!
//! Set RUST_LOG=esmart3=debug to follow polls and recovery.

use std::time::Duration;

use esmart3::{Esmart, TelemetryRecord};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let port = std::env::args().nth(1).unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let mut session = Esmart::open(&port)?;

    session.set_sink(|record: TelemetryRecord| {
        println!(
            "{:<8} PV {:5.1} V | battery {:5.1} V {:3}% | charge {:5.1} A {:4} W | load {:5.1} A {:4} W | {} C",
            record.charge_mode.to_string(),
            record.pv_voltage,
            record.battery_voltage,
            record.state_of_charge,
            record.charge_current,
            record.charge_power,
            record.load_current,
            record.load_power,
            record.internal_temp,
        );
    });

    loop {
        session.tick();
        std::thread::sleep(Duration::from_millis(50));
    }
}
