//! Core types for eSmart3 protocol data.
//!
//! - [`Frame`] is one assembled wire frame (post-marker bytes)
//! - [`TelemetryRecord`] is the decoded charger snapshot handed to sinks
//! - [`ChargeMode`] maps the controller's mode index to a typed stage
//!
//! ## Usage Example
//!
//! ```rust
//! use esmart3::types::{ChargeMode, Frame};
//!
//! let frame = Frame::new(vec![0x01, 0x01, 0x03, 0x00, 0x00, 0x51]);
//! assert_eq!(frame.source_id(), Some(3));
//! assert_eq!(ChargeMode::from_raw(3).label(), "FLOAT");
//! ```

mod charge_mode;
mod frame;
mod record;

pub use charge_mode::ChargeMode;
pub use frame::{FRAME_OVERHEAD, Frame, HEADER_LEN, MAX_FRAME_LEN, START_MARKER};
pub use record::TelemetryRecord;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_independent_values() {
        let record = TelemetryRecord {
            charge_mode: ChargeMode::ConstantCurrent,
            pv_voltage: 38.2,
            battery_voltage: 13.1,
            charge_current: 4.5,
            load_voltage: 13.0,
            load_current: 0.7,
            charge_power: 59,
            load_power: 9,
            battery_temp: 21,
            internal_temp: 30,
            state_of_charge: 84,
            co2_grams: 1200,
        };

        // Records are plain values: copies compare equal and are independent
        let mut copy = record;
        assert_eq!(copy, record);
        copy.state_of_charge = 85;
        assert_ne!(copy, record);
    }
}
