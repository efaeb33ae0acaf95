//! Assembled wire frames

use serde::{Deserialize, Serialize};

/// Byte that opens every frame on the wire.
pub const START_MARKER: u8 = 0xAA;

/// Header bytes following the marker: addr_hi, addr_lo, source_id, msg_type, payload_len.
pub const HEADER_LEN: usize = 5;

/// Header plus the single trailer byte.
pub const FRAME_OVERHEAD: usize = HEADER_LEN + 1;

/// Largest possible post-marker frame (payload length is one byte).
pub const MAX_FRAME_LEN: usize = FRAME_OVERHEAD + u8::MAX as usize;

const SOURCE_ID_OFFSET: usize = 2;
const MSG_TYPE_OFFSET: usize = 3;
const PAYLOAD_LEN_OFFSET: usize = 4;

/// One complete frame as emitted by the assembler.
///
/// Holds the post-marker bytes: header, payload and trailer. Header accessors
/// index the buffer directly; every frame produced by
/// [`FrameAssembler`](crate::protocol::FrameAssembler) is at least
/// [`FRAME_OVERHEAD`] bytes long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    data: Vec<u8>,
}

impl Frame {
    /// Wrap post-marker bytes as a frame.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Raw post-marker bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Device address (`addr_hi:addr_lo`).
    pub fn address(&self) -> Option<u16> {
        match self.data.get(..2) {
            Some(&[hi, lo]) => Some(u16::from_be_bytes([hi, lo])),
            _ => None,
        }
    }

    /// Sending device class; 3 is the MPPT charger.
    pub fn source_id(&self) -> Option<u8> {
        self.data.get(SOURCE_ID_OFFSET).copied()
    }

    pub fn msg_type(&self) -> Option<u8> {
        self.data.get(MSG_TYPE_OFFSET).copied()
    }

    pub fn payload_len(&self) -> Option<u8> {
        self.data.get(PAYLOAD_LEN_OFFSET).copied()
    }

    /// Payload bytes between the header and the trailer.
    pub fn payload(&self) -> Option<&[u8]> {
        let len = self.payload_len()? as usize;
        self.data.get(HEADER_LEN..HEADER_LEN + len)
    }

    /// Final byte of the frame.
    pub fn trailer(&self) -> Option<u8> {
        self.data.last().copied()
    }

    /// Check the trailer: every byte of the frame, marker included, sums to zero mod 256.
    ///
    /// The default decoding path never calls this; the session only consults it
    /// when checksum verification is enabled.
    pub fn checksum_ok(&self) -> bool {
        !self.data.is_empty()
            && self.data.iter().fold(START_MARKER, |acc, &b| acc.wrapping_add(b)) == 0
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
