//! Request frames sent to the controller

use crate::types::START_MARKER;

/// Requests one primary telemetry frame.
pub const POLL_REQUEST: [u8; 10] = [0xAA, 0x01, 0x01, 0x01, 0x00, 0x03, 0x00, 0x00, 0x1E, 0x32];

/// Switches the load output off.
pub const LOAD_OFF: [u8; 11] =
    [0xAA, 0x01, 0x01, 0x02, 0x04, 0x04, 0x01, 0x00, 0xFE, 0x13, 0x38];

/// Switches the load output on.
pub const LOAD_ON: [u8; 11] = [0xAA, 0x01, 0x01, 0x02, 0x04, 0x04, 0x01, 0x00, 0xFD, 0x13, 0x39];

/// Fixed commands a session can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Poll,
    LoadOn,
    LoadOff,
}

impl Command {
    /// Wire bytes, marker and trailer included.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Command::Poll => &POLL_REQUEST,
            Command::LoadOn => &LOAD_ON,
            Command::LoadOff => &LOAD_OFF,
        }
    }
}

/// Trailer byte for `bytes`: the value that makes the whole frame sum to zero mod 256.
///
/// `bytes` is everything before the trailer, marker included.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)).wrapping_neg()
}

/// Build a complete wire frame: marker, header, payload and checksum trailer.
///
/// # Panics
///
/// Panics if `payload` is longer than 255 bytes, which the one-byte length
/// field cannot describe.
pub fn encode_frame(address: u16, source_id: u8, msg_type: u8, payload: &[u8]) -> Vec<u8> {
    assert!(payload.len() <= u8::MAX as usize, "payload exceeds one-byte length field");

    let [addr_hi, addr_lo] = address.to_be_bytes();
    let mut out = Vec::with_capacity(payload.len() + 7);
    out.extend_from_slice(&[START_MARKER, addr_hi, addr_lo, source_id, msg_type]);
    out.push(payload.len() as u8);
    out.extend_from_slice(payload);
    out.push(checksum(&out));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frame;

    #[test]
    fn encoder_reproduces_fixed_commands() {
        assert_eq!(encode_frame(0x0101, 1, 0, &[0x00, 0x00, 0x1E]), POLL_REQUEST);
        assert_eq!(encode_frame(0x0101, 2, 4, &[0x01, 0x00, 0xFE, 0x13]), LOAD_OFF);
        assert_eq!(encode_frame(0x0101, 2, 4, &[0x01, 0x00, 0xFD, 0x13]), LOAD_ON);
    }

    #[test]
    fn fixed_commands_carry_valid_checksums() {
        for command in [Command::Poll, Command::LoadOn, Command::LoadOff] {
            let bytes = command.as_bytes();
            assert_eq!(bytes[0], START_MARKER);
            assert!(Frame::new(bytes[1..].to_vec()).checksum_ok(), "{command:?}");
        }
    }

    #[test]
    fn poll_request_is_ten_bytes() {
        assert_eq!(Command::Poll.as_bytes().len(), 10);
    }
}
