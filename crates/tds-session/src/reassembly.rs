//! Logical message reassembly.
//!
//! TDS messages span multiple packets; the last one carries the
//! end-of-message status bit. The flow decoder buffers packet payloads
//! here until it sees that bit (or a gap forces an early close), bounded
//! by a hard cap so a missing EOM cannot grow the buffer forever.

use bytes::BytesMut;
use tds_wire::DecodeError;

/// Accumulates the packet payloads of one logical message.
#[derive(Debug)]
pub struct Reassembly {
    buffer: BytesMut,
    cap: usize,
}

impl Reassembly {
    /// Create an accumulator bounded at `cap` bytes.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            cap,
        }
    }

    /// Append one packet payload.
    ///
    /// Fails without buffering when the message would grow past the cap;
    /// the caller then closes the message as a parse error and drops
    /// until the next EOM.
    pub fn push(&mut self, payload: &[u8]) -> Result<(), DecodeError> {
        if self.buffer.len() + payload.len() > self.cap {
            return Err(DecodeError::MessageTooLarge { cap: self.cap });
        }
        self.buffer.extend_from_slice(payload);
        Ok(())
    }

    /// Bytes buffered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Buffered bytes of the message under assembly.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop the message under assembly.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
