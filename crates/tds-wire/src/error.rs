//! Decode error types.

use thiserror::Error;

/// Result alias used throughout the wire decoders.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors produced while decoding captured TDS bytes.
///
/// [`DecodeError::TooShort`] means the capture ran out before the field
/// did; everything else means the bytes contradict the wire format.
/// The distinction matters to callers: truncation keeps whatever was
/// rendered so far, while a malformed input stops the message outright.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer captured bytes remain than the field requires.
    #[error("capture too short: need {needed} bytes, have {available}")]
    TooShort {
        /// Bytes the current read requires.
        needed: usize,
        /// Bytes remaining in the capture.
        available: usize,
    },

    /// A data type token not in the TDS type system.
    #[error("unknown data type token 0x{0:02x}")]
    UnknownTypeToken(u8),

    /// A well-known procedure id outside the defined table.
    #[error("unknown well-known procedure id {0}")]
    UnknownProcId(u16),

    /// A time-family scale byte above the protocol maximum of 7.
    #[error("invalid scale {0} for time-family type")]
    InvalidScale(u8),

    /// A PLP chunk longer than the remaining declared total.
    #[error("PLP chunk of {chunk} bytes exceeds remaining total {remaining}")]
    PlpChunkOverrun {
        /// Declared chunk length.
        chunk: u64,
        /// Remaining declared total.
        remaining: u64,
    },

    /// A variable-count value, which no current server stream carries.
    #[error("variable-count value not supported")]
    VariableCount,

    /// More result columns than the decoder is willing to track.
    #[error("column count {count} exceeds limit {limit}")]
    TooManyColumns {
        /// Columns declared by COLMETADATA.
        count: usize,
        /// Configured column limit.
        limit: usize,
    },

    /// A logical message grew past the reassembly cap.
    #[error("message exceeds reassembly cap of {cap} bytes")]
    MessageTooLarge {
        /// Configured reassembly cap.
        cap: usize,
    },

    /// A structurally invalid field, described by context.
    #[error("malformed {0}")]
    Malformed(&'static str),
}

impl DecodeError {
    /// Whether this error is capture truncation rather than malformed input.
    #[must_use]
    pub const fn is_too_short(&self) -> bool {
        matches!(self, Self::TooShort { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_short_is_distinguished() {
        let err = DecodeError::TooShort {
            needed: 4,
            available: 1,
        };
        assert!(err.is_too_short());
        assert!(!DecodeError::UnknownTypeToken(0x99).is_too_short());
    }

    #[test]
    fn display_mentions_counts() {
        let err = DecodeError::TooShort {
            needed: 8,
            available: 3,
        };
        assert_eq!(err.to_string(), "capture too short: need 8 bytes, have 3");
    }
}
