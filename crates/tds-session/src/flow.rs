//! Per-flow state and dispatch.
//!
//! One [`FlowDecoder`] owns one connection's worth of state: which
//! direction the client sits on, what it last asked for, which protocol
//! width rules apply, the column metadata rows depend on, and the
//! reassembly buffer of the message under way. The transport layer calls
//! [`FlowDecoder::feed`] once per packet in observation order; every
//! logical message comes back out as exactly one [`SqlEvent`].

use std::sync::Arc;

use tracing::{debug, trace};

use tds_wire::{Cursor, DecodeError, PacketStatus, PacketType, TypeInfo};

use crate::config::SessionConfig;
use crate::decode::{login7, prelogin, result, rpc, sql_batch};
use crate::event::{DecodeStatus, EventSink, MsgType, SqlEvent, Timestamp};
use crate::lock::LockPool;
use crate::reassembly::Reassembly;

/// Protocol state the wire format itself depends on.
#[derive(Debug)]
pub(crate) struct FlowState {
    /// Whether the negotiated version predates TDS 7.2. Starts false
    /// (assume a recent server) and becomes authoritative after a
    /// LOGINACK or the column-metadata shape heuristic.
    pub pre_7_2: bool,
    /// LOGIN7 OptionFlags1: byte order, character set, float format.
    pub option_flags1: u8,
    /// Column descriptors from the last COLMETADATA of the current
    /// message; ROW tokens consume but never mutate them.
    pub columns: Vec<TypeInfo>,
    /// Last packet type seen on the client direction; server messages
    /// mean whatever answers it.
    pub last_client_type: Option<PacketType>,
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            pre_7_2: false,
            option_flags1: 0, // ASCII, little-endian
            columns: Vec::new(),
            last_client_type: None,
        }
    }
}

/// Transport header summary delivered with each packet.
#[derive(Debug, Clone, Copy)]
pub struct PacketMeta {
    /// The TDS packet type.
    pub packet_type: PacketType,
    /// Packet status flags; bit 0 is end-of-message.
    pub status: PacketStatus,
    /// Timestamp of the packet's first byte on the wire.
    pub first_ts: Timestamp,
    /// Whether the transport lost bytes before this packet.
    pub has_gap: bool,
}

/// One transport-delivered packet.
#[derive(Debug)]
pub struct PacketInput<'a> {
    /// Direction index the transport observed the packet on (0 or 1).
    pub way: u8,
    /// Captured payload bytes.
    pub payload: &'a [u8],
    /// Length the payload had on the wire; more than captured means a gap.
    pub wire_len: usize,
    /// Transport header summary.
    pub meta: PacketMeta,
    /// Capture timestamp of this packet.
    pub now: Timestamp,
}

/// Per-connection TDS message decoder.
pub struct FlowDecoder {
    config: SessionConfig,
    state: FlowState,
    /// Direction on which the client sends; set once, never changed.
    client_way: Option<u8>,
    /// A gap poisoned the current message; parse nothing until EOM.
    had_gap: bool,
    first_ts: Option<Timestamp>,
    reassembly: Reassembly,
    flow_key: u64,
    locks: Arc<LockPool>,
    sink: Arc<dyn EventSink>,
}

impl FlowDecoder {
    /// Create the decoder for one flow.
    ///
    /// `flow_key` identifies the flow to the lock pool; the sink receives
    /// one event per logical message.
    #[must_use]
    pub fn new(
        flow_key: u64,
        config: SessionConfig,
        locks: Arc<LockPool>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let reassembly = Reassembly::new(config.max_buffered);
        Self {
            config,
            state: FlowState::default(),
            client_way: None,
            had_gap: false,
            first_ts: None,
            reassembly,
            flow_key,
            locks,
            sink,
        }
    }

    /// Feed one packet in observation order.
    ///
    /// Non-terminal packets are buffered. On end-of-message, a gap, or
    /// reassembly overflow the accumulated message is decoded and one
    /// event is emitted, whatever the decode outcome.
    pub fn feed(&mut self, input: PacketInput<'_>) {
        let locks = Arc::clone(&self.locks);
        let _serialised = locks.guard(self.flow_key);

        let has_gap = input.wire_len > input.payload.len() || input.meta.has_gap;
        let is_eom = input.meta.status.contains(PacketStatus::END_OF_MESSAGE);

        if self.client_way.is_none() {
            let way = if input.meta.packet_type.is_server_to_client() {
                input.way ^ 1
            } else {
                input.way
            };
            self.client_way = Some(way);
            trace!(client_way = way, "first packet fixed the client direction");
        }
        if self.first_ts.is_none() {
            self.first_ts = Some(input.meta.first_ts);
        }

        trace!(
            packet_type = ?input.meta.packet_type,
            cap_len = input.payload.len(),
            wire_len = input.wire_len,
            now = input.now.as_micros(),
            has_gap,
            is_eom,
            "packet"
        );

        // Buffer quietly until something closes the message.
        let mut overflowed = false;
        if !self.had_gap {
            if self.reassembly.push(input.payload).is_err() {
                overflowed = true;
            } else if !has_gap && !is_eom {
                return;
            }
        }

        let is_query = self.client_way == Some(input.way);
        let msg_type = msg_type_of(input.meta.packet_type, self.state.last_client_type);
        let first_ts = self.first_ts.take().unwrap_or(input.meta.first_ts);
        let mut event = SqlEvent::new(msg_type, is_query, first_ts);
        if is_query {
            self.state.last_client_type = Some(input.meta.packet_type);
        }

        if self.had_gap {
            // The message lost bytes earlier; only header-level facts
            // are trustworthy.
            event.status = DecodeStatus::Skipped;
        } else {
            let mut cur = Cursor::new(self.reassembly.as_slice());
            let outcome = dispatch(
                input.meta.packet_type,
                &mut cur,
                &mut self.state,
                &mut event,
                &self.config,
            );
            event.status = if overflowed {
                // Blowing the reassembly cap is resource exhaustion, a
                // parse error like the column cap, whatever the stale
                // buffer prefix happened to decode to.
                DecodeStatus::ParseError
            } else {
                match outcome {
                    // A gap means the wire had more than we saw, however
                    // smoothly the captured prefix decoded.
                    Ok(()) if has_gap => DecodeStatus::TooShort,
                    Ok(()) => DecodeStatus::Ok,
                    Err(ref e) if e.is_too_short() => DecodeStatus::TooShort,
                    Err(_) => DecodeStatus::ParseError,
                }
            };
            if let Err(e) = outcome {
                debug!(packet_type = ?input.meta.packet_type, error = %e, "message decode stopped early");
            }
        }

        self.reassembly.clear();
        self.state.columns.clear();
        self.had_gap = (self.had_gap || has_gap || overflowed) && !is_eom;
        self.sink.on_event(&event);
    }
}

fn dispatch(
    packet_type: PacketType,
    cur: &mut Cursor<'_>,
    state: &mut FlowState,
    event: &mut SqlEvent,
    config: &SessionConfig,
) -> Result<(), DecodeError> {
    match packet_type {
        PacketType::PreLogin => prelogin::decode(cur, event),
        PacketType::Tds7Login => login7::decode(cur, state, event, config),
        PacketType::SqlBatch => sql_batch::decode(cur, event, config),
        PacketType::Rpc => rpc::decode(cur, state, event, config),
        PacketType::TabularResult => result::decode(cur, state, event, config),
        // Legacy logins, attention bodies, bulk loads and the
        // manager/SSPI exchanges are classified but not decoded.
        PacketType::PreTds7Login
        | PacketType::Attention
        | PacketType::BulkLoad
        | PacketType::TransactionManager
        | PacketType::Sspi => Ok(()),
    }
}

/// What a logical message means, given what the client last sent.
fn msg_type_of(packet_type: PacketType, last_client_type: Option<PacketType>) -> MsgType {
    match packet_type {
        PacketType::SqlBatch | PacketType::Rpc | PacketType::BulkLoad => MsgType::Query,
        PacketType::Sspi
        | PacketType::PreLogin
        | PacketType::PreTds7Login
        | PacketType::Tds7Login => MsgType::Startup,
        PacketType::Attention | PacketType::TransactionManager => MsgType::Unknown,
        // A server response means whatever the request meant.
        PacketType::TabularResult => match last_client_type {
            Some(last) if last != PacketType::TabularResult => msg_type_of(last, None),
            _ => MsgType::Unknown,
        },
    }
}
