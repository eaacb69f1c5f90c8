//! TDS packet type vocabulary.
//!
//! Packet framing (header parsing, length accounting, gap detection) is
//! the transport layer's business; the message layer only needs to name
//! the packet types it dispatches on and the end-of-message status bit.

use bitflags::bitflags;

/// TDS packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// SQL batch request.
    SqlBatch = 0x01,
    /// Pre-TDS7 login packet.
    PreTds7Login = 0x02,
    /// Remote procedure call.
    Rpc = 0x03,
    /// Tabular response (server to client).
    TabularResult = 0x04,
    /// Attention signal.
    Attention = 0x06,
    /// Bulk load data.
    BulkLoad = 0x07,
    /// Transaction manager request.
    TransactionManager = 0x0E,
    /// TDS7+ login packet.
    Tds7Login = 0x10,
    /// SSPI authentication.
    Sspi = 0x11,
    /// Pre-login packet.
    PreLogin = 0x12,
}

impl PacketType {
    /// Create a packet type from a raw byte value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::SqlBatch),
            0x02 => Some(Self::PreTds7Login),
            0x03 => Some(Self::Rpc),
            0x04 => Some(Self::TabularResult),
            0x06 => Some(Self::Attention),
            0x07 => Some(Self::BulkLoad),
            0x0E => Some(Self::TransactionManager),
            0x10 => Some(Self::Tds7Login),
            0x11 => Some(Self::Sspi),
            0x12 => Some(Self::PreLogin),
            _ => None,
        }
    }

    /// Whether this packet type flows from the server to the client.
    ///
    /// Every type except `TabularResult` is a client request; this is
    /// what lets a flow infer which endpoint is the client from its
    /// first observed packet.
    #[must_use]
    pub const fn is_server_to_client(&self) -> bool {
        matches!(self, Self::TabularResult)
    }
}

bitflags! {
    /// TDS packet status flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PacketStatus: u8 {
        /// End of message (last packet of the logical message).
        const END_OF_MESSAGE = 0x01;
        /// Ignore this event (attention acknowledgment).
        const IGNORE_EVENT = 0x02;
        /// Reset connection.
        const RESET_CONNECTION = 0x08;
        /// Reset connection but keep transaction state.
        const RESET_CONNECTION_KEEP_TRANSACTION = 0x10;
    }
}
