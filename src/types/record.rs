//! Decoded charge-controller telemetry

use serde::{Deserialize, Serialize};

use super::ChargeMode;

/// Snapshot decoded from one primary telemetry frame.
///
/// Voltages and currents arrive as tenths and are scaled to volts/amps.
/// Powers are whole watts. Temperatures and state of charge are passed
/// through as the raw bytes the controller sends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub charge_mode: ChargeMode,
    /// Panel voltage (V)
    pub pv_voltage: f32,
    /// Battery voltage (V)
    pub battery_voltage: f32,
    /// Charge current into the battery (A)
    pub charge_current: f32,
    /// Load output voltage (V)
    pub load_voltage: f32,
    /// Load output current (A)
    pub load_current: f32,
    /// Charge power (W)
    pub charge_power: u16,
    /// Load power (W)
    pub load_power: u16,
    pub battery_temp: u8,
    pub internal_temp: u8,
    /// Battery state of charge (%)
    pub state_of_charge: u8,
    /// Cumulative CO2 savings reported by the controller (g)
    pub co2_grams: u16,
}
