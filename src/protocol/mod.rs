//! eSmart3 wire protocol.
//!
//! Frames on the wire look like:
//!
//! ```text
//! 0xAA | addr_hi addr_lo source_id msg_type payload_len | payload ... | trailer
//! ```
//!
//! [`FrameAssembler`] cuts the byte stream into frames, [`decode`] turns primary
//! telemetry frames into records, and [`commands`] holds the request frames the
//! session writes back.

pub mod commands;

mod assembler;
mod decoder;

pub use assembler::FrameAssembler;
pub use commands::{Command, LOAD_OFF, LOAD_ON, POLL_REQUEST, checksum, encode_frame};
pub use decoder::{Decoded, MIN_TELEMETRY_FRAME_LEN, MPPT_SOURCE_ID, PRIMARY_TELEMETRY, decode};
