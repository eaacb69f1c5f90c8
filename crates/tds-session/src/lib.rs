//! # tds-session
//!
//! Per-flow TDS message semantics for passive capture analysis.
//!
//! The transport layer hands this crate de-framed packet payloads in
//! observation order, each with a packet header summary (type, status,
//! first-byte timestamp, gap indicator). [`FlowDecoder`] reassembles the
//! packets of each logical message, tracks the per-connection state the
//! wire format depends on (client direction, negotiated version, column
//! metadata, last client request type), runs the right message decoder,
//! and emits one [`SqlEvent`] per logical message to the configured sink.
//!
//! Decoding never fails a flow: truncated or malformed messages emit an
//! event describing what could be extracted, and the flow keeps working
//! from the next end-of-message boundary.

pub mod config;
mod decode;
pub mod event;
pub mod flow;
pub mod lock;
pub mod reassembly;

pub use config::SessionConfig;
pub use event::{
    DecodeStatus, EventSink, MsgType, RequestStatus, SessionEncoding, SetValues, SqlEvent,
    Timestamp,
};
pub use flow::{FlowDecoder, PacketInput, PacketMeta};
pub use lock::LockPool;
