//! The emitted SQL event and its sink.

use bitflags::bitflags;
use tds_wire::{SqlText, TdsVersion};

/// Microseconds since the epoch, as stamped by the capture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Microseconds since the epoch.
    #[must_use]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }
}

bitflags! {
    /// Which optional event fields were actually extracted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SetValues: u16 {
        /// `user` holds the login user name.
        const USER = 0x0001;
        /// `passwd` holds the (still scrambled) login password bytes.
        const PASSWD = 0x0002;
        /// `dbname` holds a database name.
        const DBNAME = 0x0004;
        /// `version` holds a protocol version.
        const VERSION = 0x0008;
        /// `sql` holds query text.
        const SQL = 0x0010;
        /// `row_count` is valid.
        const ROW_COUNT = 0x0020;
        /// `field_count` is valid.
        const FIELD_COUNT = 0x0040;
        /// `error_code` is valid.
        const ERROR_CODE = 0x0080;
        /// `error_message` holds a server error message.
        const ERROR_MESSAGE = 0x0100;
        /// `request_status` is valid.
        const REQUEST_STATUS = 0x0200;
        /// The peer asked for TLS during prelogin.
        const SSL_REQUEST = 0x0400;
        /// `encoding` holds a session character encoding.
        const ENCODING = 0x0800;
    }
}

/// Coarse classification of a logical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MsgType {
    /// Connection setup traffic (prelogin, login, authentication).
    Startup,
    /// Query traffic (batches, RPC, result streams).
    Query,
    /// Anything the decoder cannot classify.
    #[default]
    Unknown,
}

/// Outcome of a finished request, as far as the result stream tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// The request completed.
    Complete,
    /// The server reported an error for the request.
    Error,
}

/// Session character encoding announced by an environment change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEncoding {
    /// ISO-8859-1 / `iso_1`.
    Latin1,
    /// UTF-8.
    Utf8,
    /// Anything else.
    Unknown,
}

/// How decoding the message went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeStatus {
    /// The message decoded cleanly.
    #[default]
    Ok,
    /// The capture ran out mid-message; extracted fields are partial.
    TooShort,
    /// The bytes contradicted the wire format; extraction stopped there.
    ParseError,
    /// The message followed a capture gap and was not decoded.
    Skipped,
}

/// One structured SQL event per logical TDS message.
///
/// `set_values` says which optional fields were extracted; everything
/// else is only meaningful when its bit is set. String fields carry a
/// truncation marker from the rendering sink.
#[derive(Debug, Clone, Default)]
pub struct SqlEvent {
    /// Classification of the message.
    pub msg_type: MsgType,
    /// Whether the message travelled client-to-server.
    pub is_query: bool,
    /// Timestamp of the first packet of the logical message.
    pub first_ts: Timestamp,
    /// Which optional fields are populated.
    pub set_values: SetValues,
    /// How decoding went.
    pub status: DecodeStatus,

    /// Login user name.
    pub user: SqlText,
    /// Login password, still scrambled as on the wire.
    pub passwd: SqlText,
    /// Database name, from login or an environment change.
    pub dbname: SqlText,
    /// Negotiated or advertised protocol version.
    pub version: Option<TdsVersion>,
    /// Rendered SQL text (query or procedure call with parameters).
    pub sql: SqlText,
    /// Rows affected or returned.
    pub row_count: u64,
    /// Result columns announced by metadata.
    pub field_count: u32,
    /// First server error code of the message.
    pub error_code: u32,
    /// First server error message of the message.
    pub error_message: SqlText,
    /// Outcome of the request, when the stream settles it.
    pub request_status: Option<RequestStatus>,
    /// Whether the peer asked for TLS.
    pub ssl_request: bool,
    /// Session character encoding.
    pub encoding: Option<SessionEncoding>,
}

impl SqlEvent {
    /// Create an empty event for a message.
    #[must_use]
    pub fn new(msg_type: MsgType, is_query: bool, first_ts: Timestamp) -> Self {
        Self {
            msg_type,
            is_query,
            first_ts,
            ..Self::default()
        }
    }

    /// Record the protocol version.
    pub fn set_version(&mut self, version: TdsVersion) {
        self.version = Some(version);
        self.set_values |= SetValues::VERSION;
    }

    /// Record the row count; a later DONE in the same message overwrites.
    pub fn set_row_count(&mut self, rows: u64) {
        self.row_count = rows;
        self.set_values |= SetValues::ROW_COUNT;
    }

    /// Count one decoded row.
    pub fn add_row(&mut self) {
        self.row_count += 1;
        self.set_values |= SetValues::ROW_COUNT;
    }

    /// Add result columns announced by a metadata token.
    pub fn add_field_count(&mut self, fields: u32) {
        self.field_count += fields;
        self.set_values |= SetValues::FIELD_COUNT;
    }

    /// Record the request outcome; the first status of a message wins.
    pub fn set_request_status(&mut self, status: RequestStatus) {
        if self.set_values.contains(SetValues::REQUEST_STATUS) {
            return;
        }
        self.request_status = Some(status);
        self.set_values |= SetValues::REQUEST_STATUS;
    }

    /// Record the session encoding.
    pub fn set_encoding(&mut self, encoding: SessionEncoding) {
        self.encoding = Some(encoding);
        self.set_values |= SetValues::ENCODING;
    }
}

/// Receiver of emitted events.
///
/// Implementations must be non-blocking and thread-safe; many flows emit
/// concurrently from the worker pool.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn on_event(&self, event: &SqlEvent);
}
