//! Server token stream and prelogin option vocabulary.

/// Token type identifiers of the server result stream.
///
/// Every token the stream can carry is named here; the ALT-prefixed
/// rows and the informational bookkeeping tokens are recognised so the
/// token loop can report them by name, but only a subset is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenType {
    /// Alternate metadata (ALTMETADATA).
    AltMetaData = 0x88,
    /// Alternate row (ALTROW).
    AltRow = 0xD3,
    /// Column metadata (COLMETADATA).
    ColMetaData = 0x81,
    /// Column info (COLINFO).
    ColInfo = 0xA5,
    /// Done (DONE).
    Done = 0xFD,
    /// Done procedure (DONEPROC).
    DoneProc = 0xFE,
    /// Done in procedure (DONEINPROC).
    DoneInProc = 0xFF,
    /// Environment change (ENVCHANGE).
    EnvChange = 0xE3,
    /// Error message (ERROR).
    Error = 0xAA,
    /// Feature extension acknowledgment (FEATUREEXTACK).
    FeatureExtAck = 0xAE,
    /// Informational message (INFO).
    Info = 0xAB,
    /// Login acknowledgment (LOGINACK).
    LoginAck = 0xAD,
    /// Null bitmap compressed row (NBCROW).
    NbcRow = 0xD2,
    /// Offset (OFFSET).
    Offset = 0x78,
    /// Column ordering (ORDER).
    Order = 0xA9,
    /// Return status (RETURNSTATUS).
    ReturnStatus = 0x79,
    /// Return value (RETURNVALUE).
    ReturnValue = 0xAC,
    /// Row data (ROW).
    Row = 0xD1,
    /// Session state (SESSIONSTATE).
    SessionState = 0xE4,
    /// SSPI authentication (SSPI).
    Sspi = 0xED,
    /// Table name (TABNAME).
    TabName = 0xA4,
}

impl TokenType {
    /// Create a token type from a raw byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x88 => Some(Self::AltMetaData),
            0xD3 => Some(Self::AltRow),
            0x81 => Some(Self::ColMetaData),
            0xA5 => Some(Self::ColInfo),
            0xFD => Some(Self::Done),
            0xFE => Some(Self::DoneProc),
            0xFF => Some(Self::DoneInProc),
            0xE3 => Some(Self::EnvChange),
            0xAA => Some(Self::Error),
            0xAE => Some(Self::FeatureExtAck),
            0xAB => Some(Self::Info),
            0xAD => Some(Self::LoginAck),
            0xD2 => Some(Self::NbcRow),
            0x78 => Some(Self::Offset),
            0xA9 => Some(Self::Order),
            0x79 => Some(Self::ReturnStatus),
            0xAC => Some(Self::ReturnValue),
            0xD1 => Some(Self::Row),
            0xE4 => Some(Self::SessionState),
            0xED => Some(Self::Sspi),
            0xA4 => Some(Self::TabName),
            _ => None,
        }
    }
}

/// DONE token status flag bits.
pub mod done_status {
    /// More results follow.
    pub const DONE_MORE: u16 = 0x0001;
    /// An error terminated the statement.
    pub const DONE_ERROR: u16 = 0x0002;
    /// A transaction is in progress.
    pub const DONE_INXACT: u16 = 0x0004;
    /// The row count field is valid.
    pub const DONE_COUNT_SET: u16 = 0x0010;
    /// Attention acknowledgment.
    pub const DONE_ATTN: u16 = 0x0020;
    /// RPC within a batch.
    pub const DONE_RPC_IN_BATCH: u16 = 0x0080;
    /// A server error occurred.
    pub const DONE_SRVERROR: u16 = 0x0100;
}

/// Environment change sub-types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EnvChangeType {
    /// Database changed.
    Database = 0x01,
    /// Language changed.
    Language = 0x02,
    /// Character set changed.
    CharacterSet = 0x03,
    /// Packet size changed.
    PacketSize = 0x04,
    /// Unicode data sorting locale id.
    UnicodeLocalId = 0x05,
    /// Unicode comparison flags.
    UnicodeComparisonFlags = 0x06,
    /// SQL collation.
    Collation = 0x07,
    /// Begin transaction.
    BeginTransaction = 0x08,
    /// Commit transaction.
    CommitTransaction = 0x09,
    /// Rollback transaction.
    RollbackTransaction = 0x0A,
    /// Enlist DTC transaction.
    EnlistTransaction = 0x0B,
    /// Defect transaction.
    DefectTransaction = 0x0C,
    /// Real-time log shipping.
    RealTimeLog = 0x0D,
    /// Promote transaction.
    PromoteTransaction = 0x0F,
    /// Transaction manager address.
    TransactionManager = 0x10,
    /// Transaction ended.
    TransactionEnded = 0x11,
    /// Reset connection acknowledgment.
    ResetConnection = 0x12,
    /// Send back instance name.
    SendBackInstance = 0x13,
    /// Routing information.
    SendRoutingInfo = 0x14,
}

impl EnvChangeType {
    /// Create from a raw sub-type byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Database),
            0x02 => Some(Self::Language),
            0x03 => Some(Self::CharacterSet),
            0x04 => Some(Self::PacketSize),
            0x05 => Some(Self::UnicodeLocalId),
            0x06 => Some(Self::UnicodeComparisonFlags),
            0x07 => Some(Self::Collation),
            0x08 => Some(Self::BeginTransaction),
            0x09 => Some(Self::CommitTransaction),
            0x0A => Some(Self::RollbackTransaction),
            0x0B => Some(Self::EnlistTransaction),
            0x0C => Some(Self::DefectTransaction),
            0x0D => Some(Self::RealTimeLog),
            0x0F => Some(Self::PromoteTransaction),
            0x10 => Some(Self::TransactionManager),
            0x11 => Some(Self::TransactionEnded),
            0x12 => Some(Self::ResetConnection),
            0x13 => Some(Self::SendBackInstance),
            0x14 => Some(Self::SendRoutingInfo),
            _ => None,
        }
    }
}

/// Prelogin option tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PreloginToken {
    /// Version information.
    Version = 0x00,
    /// Encryption negotiation.
    Encryption = 0x01,
    /// Instance name.
    InstOpt = 0x02,
    /// Thread id.
    ThreadId = 0x03,
    /// MARS support.
    Mars = 0x04,
    /// Trace id.
    TraceId = 0x05,
    /// End of the option table.
    Terminator = 0xFF,
}

impl PreloginToken {
    /// Create from a raw option byte; unknown options are carried as-is
    /// by the table walk, so this only names the ones that matter.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Version),
            0x01 => Some(Self::Encryption),
            0x02 => Some(Self::InstOpt),
            0x03 => Some(Self::ThreadId),
            0x04 => Some(Self::Mars),
            0x05 => Some(Self::TraceId),
            0xFF => Some(Self::Terminator),
            _ => None,
        }
    }
}

/// Prelogin encryption negotiation values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EncryptionLevel {
    /// Encryption is off.
    Off = 0x00,
    /// Encryption is on.
    On = 0x01,
    /// Encryption is not supported.
    NotSupported = 0x02,
    /// Encryption is required.
    Required = 0x03,
}

impl EncryptionLevel {
    /// Create from a raw byte value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Off),
            0x01 => Some(Self::On),
            0x02 => Some(Self::NotSupported),
            0x03 => Some(Self::Required),
            _ => None,
        }
    }

    /// Whether this level amounts to asking for TLS.
    ///
    /// `Required` (the server insists) counts the same as `On` here;
    /// the finer distinction is the caller's business.
    #[must_use]
    pub const fn requests_ssl(&self) -> bool {
        matches!(self, Self::On | Self::Required)
    }
}
