//! Typed decoding of assembled frames

use crate::types::{ChargeMode, Frame, TelemetryRecord};
use crate::{LinkError, Result};

/// Source id the charger uses for its own frames.
pub const MPPT_SOURCE_ID: u8 = 3;

/// Message type of the primary telemetry frame.
pub const PRIMARY_TELEMETRY: u8 = 0;

/// Shortest frame that covers every telemetry field offset.
pub const MIN_TELEMETRY_FRAME_LEN: usize = 35;

/// Outcome of decoding one well-framed buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Primary telemetry from the charger
    Telemetry(TelemetryRecord),
    /// Any other source/type combination; ignored by the session
    Unrecognized { source_id: u8, msg_type: u8 },
}

/// Decode one complete frame.
///
/// Only `source_id == 3, msg_type == 0` frames produce a record. A telemetry
/// frame too short for the fixed field offsets is a
/// [`LinkError::MalformedFrame`]; other frame kinds are never inspected
/// beyond their header.
pub fn decode(frame: &Frame) -> Result<Decoded> {
    let data = frame.as_bytes();
    let (Some(source_id), Some(msg_type)) = (frame.source_id(), frame.msg_type()) else {
        return Err(LinkError::malformed_frame(data.len(), 4));
    };

    if source_id != MPPT_SOURCE_ID || msg_type != PRIMARY_TELEMETRY {
        return Ok(Decoded::Unrecognized { source_id, msg_type });
    }

    if data.len() < MIN_TELEMETRY_FRAME_LEN {
        return Err(LinkError::malformed_frame(data.len(), MIN_TELEMETRY_FRAME_LEN));
    }

    // Offsets index the post-marker buffer: 5 header bytes, then payload.
    Ok(Decoded::Telemetry(TelemetryRecord {
        charge_mode: ChargeMode::from_raw(u16_le(data, 7)),
        pv_voltage: tenths(data, 9),
        battery_voltage: tenths(data, 11),
        charge_current: tenths(data, 13),
        load_voltage: tenths(data, 17),
        load_current: tenths(data, 19),
        charge_power: u16_le(data, 21),
        load_power: u16_le(data, 23),
        battery_temp: data[25],
        internal_temp: data[27],
        state_of_charge: data[29],
        co2_grams: u16_le(data, 33),
    }))
}

// Callers guarantee `offset + 2 <= data.len()` via MIN_TELEMETRY_FRAME_LEN.
fn u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn tenths(data: &[u8], offset: usize) -> f32 {
    f32::from(u16_le(data, offset)) / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TelemetryPayload, telemetry_frame};
    use proptest::prelude::*;

    #[test]
    fn pv_voltage_scales_by_ten() {
        let payload = TelemetryPayload { pv_voltage: 255, ..TelemetryPayload::default() };
        let frame = telemetry_frame(&payload);

        let Decoded::Telemetry(record) = decode(&frame).unwrap() else {
            panic!("expected telemetry");
        };
        assert_eq!(record.pv_voltage, 25.5);
    }

    #[test]
    fn every_field_follows_its_offset() {
        let payload = TelemetryPayload {
            charge_mode: 3,
            pv_voltage: 382,
            battery_voltage: 131,
            charge_current: 45,
            load_voltage: 130,
            load_current: 7,
            charge_power: 590,
            load_power: 9,
            battery_temp: 21,
            internal_temp: 33,
            state_of_charge: 84,
            co2_grams: 0x1234,
        };

        let Decoded::Telemetry(record) = decode(&telemetry_frame(&payload)).unwrap() else {
            panic!("expected telemetry");
        };

        assert_eq!(record.charge_mode, ChargeMode::Float);
        assert_eq!(record.pv_voltage, 38.2);
        assert_eq!(record.battery_voltage, 13.1);
        assert_eq!(record.charge_current, 4.5);
        assert_eq!(record.load_voltage, 13.0);
        assert_eq!(record.load_current, 0.7);
        assert_eq!(record.charge_power, 590);
        assert_eq!(record.load_power, 9);
        assert_eq!(record.battery_temp, 21);
        assert_eq!(record.internal_temp, 33);
        assert_eq!(record.state_of_charge, 84);
        assert_eq!(record.co2_grams, 0x1234);
    }

    #[test]
    fn short_telemetry_frame_is_malformed() {
        let mut bytes = vec![0x01, 0x01, MPPT_SOURCE_ID, PRIMARY_TELEMETRY, 4];
        bytes.extend_from_slice(&[0, 0, 0, 0, 0]);

        let err = decode(&Frame::new(bytes)).unwrap_err();
        assert!(matches!(err, LinkError::MalformedFrame { length: 10, required: 35 }));
    }

    #[test]
    fn truncated_header_is_malformed() {
        let err = decode(&Frame::new(vec![0x01, 0x01, 0x03])).unwrap_err();
        assert!(matches!(err, LinkError::MalformedFrame { .. }));
    }

    proptest! {
        #[test]
        fn foreign_frames_are_unrecognized(
            source_id in any::<u8>(),
            msg_type in any::<u8>(),
            payload in prop::collection::vec(any::<u8>(), 0..64)
        ) {
            prop_assume!(source_id != MPPT_SOURCE_ID || msg_type != PRIMARY_TELEMETRY);

            let mut bytes = vec![0x01, 0x01, source_id, msg_type, payload.len() as u8];
            bytes.extend_from_slice(&payload);
            bytes.push(0);

            let decoded = decode(&Frame::new(bytes));
            prop_assert_eq!(decoded.ok(), Some(Decoded::Unrecognized { source_id, msg_type }));
        }

        #[test]
        fn decoding_is_deterministic(payload in prop::collection::vec(any::<u8>(), 29..64)) {
            let mut bytes = vec![0x01, 0x01, MPPT_SOURCE_ID, PRIMARY_TELEMETRY, payload.len() as u8];
            bytes.extend_from_slice(&payload);
            bytes.push(0);
            let frame = Frame::new(bytes);

            let first = decode(&frame).ok();
            prop_assert!(matches!(first, Some(Decoded::Telemetry(_))));
            prop_assert_eq!(first, decode(&frame).ok());
        }
    }
}
