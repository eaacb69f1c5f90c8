//! # tds-wire
//!
//! Wire-format decoding primitives for the MS-TDS (Tabular Data Stream)
//! protocol, as seen from a passive observation point.
//!
//! This crate decodes the byte-level vocabulary of TDS 7.0 through 7.4:
//! the data type system (`TYPE_INFO` descriptors and the values they
//! govern, including Partially Length-Prefixed data), the length-prefixed
//! string forms, the server token stream identifiers, and the packet type
//! vocabulary. It operates over captured byte slices which may be
//! truncated at any point; every read is bounds-checked and truncation is
//! reported as [`DecodeError::TooShort`] rather than a panic.
//!
//! ## Design Philosophy
//!
//! This crate is intentionally IO-agnostic and holds no per-connection
//! state. Anything that depends on negotiated protocol state (such as the
//! pre-7.2 width differences) is passed in by the caller. The session
//! layer builds per-flow semantics on top of this foundation.

pub mod codec;
pub mod cursor;
pub mod error;
pub mod packet;
pub mod sink;
pub mod token;
pub mod types;
pub mod value;
pub mod version;

pub use cursor::Cursor;
pub use error::{DecodeError, DecodeResult};
pub use packet::{PacketStatus, PacketType};
pub use sink::{SqlText, StringSink};
pub use token::{EncryptionLevel, EnvChangeType, PreloginToken, TokenType, done_status};
pub use types::{TypeClass, TypeId, TypeInfo};
pub use value::decode_value;
pub use version::TdsVersion;
