//! Byte-stream frame reassembly

use tracing::{debug, trace};

use crate::types::{FRAME_OVERHEAD, Frame, HEADER_LEN, MAX_FRAME_LEN, START_MARKER};

/// Placeholder target length until the header's length byte has arrived.
const UNKNOWN_TARGET_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssemblerState {
    AwaitingMarker,
    Accumulating { target_len: usize },
}

/// Reassembles length-delimited frames from a continuous byte stream.
///
/// Bytes are discarded until a start marker arrives. After the marker every
/// byte is appended to the buffer; once the five header bytes are in, the
/// length byte fixes the target at `6 + payload_len`. Reaching the target
/// emits the buffer as a [`Frame`].
///
/// Framing is positional: a marker byte inside a frame is ordinary content
/// and does not restart framing. State persists across calls, so a frame may
/// be split over any number of chunks.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    state: AssemblerState,
    buffer: Vec<u8>,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self { state: AssemblerState::AwaitingMarker, buffer: Vec::with_capacity(MAX_FRAME_LEN) }
    }

    /// Process one byte, returning a frame when it completes one.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        match self.state {
            AssemblerState::AwaitingMarker => {
                if byte == START_MARKER {
                    self.buffer.clear();
                    self.state = AssemblerState::Accumulating { target_len: UNKNOWN_TARGET_LEN };
                }
                None
            }
            AssemblerState::Accumulating { mut target_len } => {
                // Never reached: the one-byte length field caps the target at MAX_FRAME_LEN.
                if self.buffer.len() >= MAX_FRAME_LEN {
                    debug!(len = self.buffer.len(), "Frame buffer overflow, dropping partial frame");
                    self.reset();
                    return None;
                }

                self.buffer.push(byte);

                if self.buffer.len() == HEADER_LEN {
                    target_len = FRAME_OVERHEAD + self.buffer[HEADER_LEN - 1] as usize;
                    self.state = AssemblerState::Accumulating { target_len };
                }

                if self.buffer.len() == target_len {
                    self.state = AssemblerState::AwaitingMarker;
                    let frame = Frame::new(std::mem::take(&mut self.buffer));
                    self.buffer.reserve(MAX_FRAME_LEN);
                    trace!(len = frame.len(), "Frame assembled");
                    return Some(frame);
                }

                None
            }
        }
    }

    /// Process a chunk in order, returning every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        chunk.iter().filter_map(|&byte| self.push(byte)).collect()
    }

    /// Drop any partial frame and wait for the next marker.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = AssemblerState::AwaitingMarker;
    }

    /// Whether a marker has been seen and a frame is partially built.
    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, AssemblerState::Accumulating { .. })
    }

    /// Bytes accumulated toward the current frame.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}
