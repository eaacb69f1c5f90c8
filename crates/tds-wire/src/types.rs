//! The TDS data type system.
//!
//! Column and parameter values are described on the wire by a `TYPE_INFO`
//! descriptor: a one-byte type token followed by token-dependent metadata
//! (maximum length, precision/scale, collation, XML schema references).
//! [`TypeInfo::parse`] consumes the whole descriptor, so the value
//! decoder afterwards only ever sees a length and a payload.

use crate::codec::{skip_b_varchar, skip_us_varchar};
use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};

/// TDS data type identifiers.
///
/// These are the type bytes carried in column metadata, RETURNVALUE and
/// RPC parameter descriptors, covering both the current and the pre-7.2
/// legacy forms that still show up in captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeId {
    /// Null type.
    Null = 0x1F,

    // Fixed-length types (no length prefix; width encoded in the token byte)
    /// 8-bit signed integer.
    Int1 = 0x30,
    /// Bit (boolean).
    Bit = 0x32,
    /// 16-bit signed integer.
    Int2 = 0x34,
    /// 32-bit signed integer.
    Int4 = 0x38,
    /// 4-byte small datetime.
    DateTime4 = 0x3A,
    /// 32-bit floating point.
    Float4 = 0x3B,
    /// 8-byte money.
    Money = 0x3C,
    /// 8-byte datetime.
    DateTime = 0x3D,
    /// 64-bit floating point.
    Float8 = 0x3E,
    /// 4-byte money.
    Money4 = 0x7A,
    /// 64-bit signed integer.
    Int8 = 0x7F,

    // Byte-length types (1-byte length prefix)
    /// GUID.
    Guid = 0x24,
    /// Variable-length integer.
    IntN = 0x26,
    /// Legacy decimal.
    Decimal = 0x37,
    /// Legacy numeric.
    Numeric = 0x3F,
    /// Variable-length bit.
    BitN = 0x68,
    /// Decimal with precision and scale.
    DecimalN = 0x6A,
    /// Numeric with precision and scale.
    NumericN = 0x6C,
    /// Variable-length float.
    FloatN = 0x6D,
    /// Variable-length money.
    MoneyN = 0x6E,
    /// Variable-length datetime.
    DateTimeN = 0x6F,
    /// Date (TDS 7.3+).
    Date = 0x28,
    /// Time with scale (TDS 7.3+).
    Time = 0x29,
    /// DateTime2 with scale (TDS 7.3+).
    DateTime2 = 0x2A,
    /// DateTimeOffset with scale (TDS 7.3+).
    DateTimeOffset = 0x2B,
    /// Legacy fixed-length character.
    Char = 0x2F,
    /// Legacy variable-length character.
    VarChar = 0x27,
    /// Legacy fixed-length binary.
    Binary = 0x2D,
    /// Legacy variable-length binary.
    VarBinary = 0x25,

    // Ushort-length types (2-byte length prefix)
    /// Large variable-length binary.
    BigVarBinary = 0xA5,
    /// Large variable-length character.
    BigVarChar = 0xA7,
    /// Large fixed-length binary.
    BigBinary = 0xAD,
    /// Large fixed-length character.
    BigChar = 0xAF,
    /// Variable-length Unicode character.
    NVarChar = 0xE7,
    /// Fixed-length Unicode character.
    NChar = 0xEF,

    // Long-length types (4-byte length prefix)
    /// Image (deprecated large binary).
    Image = 0x22,
    /// Text (deprecated large character).
    Text = 0x23,
    /// NText (deprecated large Unicode character).
    NText = 0x63,
    /// SQL variant.
    Variant = 0x62,

    // Partially length-prefixed
    /// User-defined type.
    Udt = 0xF0,
    /// XML.
    Xml = 0xF1,
}

impl TypeId {
    /// Create a type identifier from a raw token byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x1F => Some(Self::Null),
            0x30 => Some(Self::Int1),
            0x32 => Some(Self::Bit),
            0x34 => Some(Self::Int2),
            0x38 => Some(Self::Int4),
            0x3A => Some(Self::DateTime4),
            0x3B => Some(Self::Float4),
            0x3C => Some(Self::Money),
            0x3D => Some(Self::DateTime),
            0x3E => Some(Self::Float8),
            0x7A => Some(Self::Money4),
            0x7F => Some(Self::Int8),
            0x24 => Some(Self::Guid),
            0x26 => Some(Self::IntN),
            0x37 => Some(Self::Decimal),
            0x3F => Some(Self::Numeric),
            0x68 => Some(Self::BitN),
            0x6A => Some(Self::DecimalN),
            0x6C => Some(Self::NumericN),
            0x6D => Some(Self::FloatN),
            0x6E => Some(Self::MoneyN),
            0x6F => Some(Self::DateTimeN),
            0x28 => Some(Self::Date),
            0x29 => Some(Self::Time),
            0x2A => Some(Self::DateTime2),
            0x2B => Some(Self::DateTimeOffset),
            0x2F => Some(Self::Char),
            0x27 => Some(Self::VarChar),
            0x2D => Some(Self::Binary),
            0x25 => Some(Self::VarBinary),
            0xA5 => Some(Self::BigVarBinary),
            0xA7 => Some(Self::BigVarChar),
            0xAD => Some(Self::BigBinary),
            0xAF => Some(Self::BigChar),
            0xE7 => Some(Self::NVarChar),
            0xEF => Some(Self::NChar),
            0x22 => Some(Self::Image),
            0x23 => Some(Self::Text),
            0x63 => Some(Self::NText),
            0x62 => Some(Self::Variant),
            0xF0 => Some(Self::Udt),
            0xF1 => Some(Self::Xml),
            _ => None,
        }
    }

    /// Whether a raw byte is any known type token.
    ///
    /// Used by the column-metadata shape heuristic, which probes raw
    /// descriptor bytes to tell the pre- and post-7.2 layouts apart.
    #[must_use]
    pub fn is_type_token(value: u8) -> bool {
        Self::from_u8(value).is_some()
    }

    /// Whether values of this type render as text.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(
            self,
            Self::BigChar
                | Self::BigVarChar
                | Self::Text
                | Self::NText
                | Self::NChar
                | Self::NVarChar
                | Self::Xml
        )
    }

    /// Whether textual values of this type are UCS-2 encoded.
    #[must_use]
    pub const fn is_unicode_text(&self) -> bool {
        matches!(self, Self::NChar | Self::NVarChar | Self::NText | Self::Xml)
    }

    /// Width of the length prefix for the variable-length classes.
    const fn length_width(self) -> usize {
        match self {
            Self::Guid
            | Self::IntN
            | Self::Decimal
            | Self::Numeric
            | Self::BitN
            | Self::DecimalN
            | Self::NumericN
            | Self::FloatN
            | Self::MoneyN
            | Self::DateTimeN
            | Self::Date
            | Self::Time
            | Self::DateTime2
            | Self::DateTimeOffset
            | Self::Char
            | Self::VarChar
            | Self::Binary
            | Self::VarBinary => 1,
            Self::BigVarBinary
            | Self::BigVarChar
            | Self::BigBinary
            | Self::BigChar
            | Self::NVarChar
            | Self::NChar => 2,
            _ => 4,
        }
    }

    /// Descriptor bytes that follow the declared maximum length.
    const fn trailing_metadata(self) -> usize {
        match self {
            // Collation
            Self::BigChar
            | Self::BigVarChar
            | Self::Text
            | Self::NVarChar
            | Self::NChar
            | Self::NText => 5,
            // Precision and scale
            Self::DecimalN | Self::NumericN => 2,
            _ => 0,
        }
    }
}

/// Length class of a type: how the value announces its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// No value bytes at all.
    Zero,
    /// A fixed number of value bytes.
    Fixed,
    /// A length prefix followed by that many bytes.
    VarLen,
    /// A count of fields (reserved; rejected at value time).
    VarCount,
    /// Partially length-prefixed chunked data (TDS 7.2+).
    Plp,
}

/// A parsed `TYPE_INFO` descriptor.
///
/// `size` is the value width for [`TypeClass::Fixed`] and the width of
/// the length prefix for [`TypeClass::VarLen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    /// The type token.
    pub id: TypeId,
    /// How values of this type announce their size.
    pub class: TypeClass,
    /// Value width or length-prefix width, per `class`.
    pub size: usize,
}

/// Declared maximum length beyond which post-7.2 servers switch a
/// variable-length character or binary type to PLP encoding.
const PLP_ESCALATION_LIMIT: u64 = 8000;

impl TypeInfo {
    /// Parse a `TYPE_INFO` descriptor.
    ///
    /// Consumes the type token and all of its metadata (maximum length,
    /// scale, precision, collation, XML schema references), leaving the
    /// cursor at the start of the first value. `pre_7_2` governs whether
    /// over-long character and binary types escalate to PLP.
    pub fn parse(cur: &mut Cursor<'_>, pre_7_2: bool) -> DecodeResult<Self> {
        let token = cur.read_u8()?;
        let id = TypeId::from_u8(token).ok_or(DecodeError::UnknownTypeToken(token))?;

        match id {
            TypeId::Null => Ok(Self {
                id,
                class: TypeClass::Zero,
                size: 0,
            }),

            TypeId::Int1
            | TypeId::Bit
            | TypeId::Int2
            | TypeId::Int4
            | TypeId::DateTime4
            | TypeId::Float4
            | TypeId::Money
            | TypeId::DateTime
            | TypeId::Float8
            | TypeId::Money4
            | TypeId::Int8 => Ok(Self {
                id,
                class: TypeClass::Fixed,
                // Width is encoded in the token byte itself.
                size: 1 << ((token >> 2) & 3),
            }),

            // Scale byte only; the value length is repeated at value time.
            TypeId::Time | TypeId::DateTime2 | TypeId::DateTimeOffset => {
                let scale = cur.read_u8()?;
                if scale > 7 {
                    return Err(DecodeError::InvalidScale(scale));
                }
                Ok(Self {
                    id,
                    class: TypeClass::VarLen,
                    size: 1,
                })
            }

            TypeId::Udt => Ok(Self {
                id,
                class: TypeClass::Plp,
                size: 0,
            }),

            TypeId::Xml => {
                let schema_present = cur.read_u8()?;
                if schema_present != 0 {
                    skip_b_varchar(cur)?; // database name
                    skip_b_varchar(cur)?; // owning schema
                    skip_us_varchar(cur)?; // XML schema collection
                }
                Ok(Self {
                    id,
                    class: TypeClass::Plp,
                    size: 0,
                })
            }

            _ => {
                let size = id.length_width();
                let max_len = cur.read_fixed_uint_le(size)?;
                let trailing = id.trailing_metadata();
                if trailing > 0 {
                    cur.skip(trailing)?;
                }
                let class = if !pre_7_2
                    && matches!(id, TypeId::BigVarChar | TypeId::BigVarBinary | TypeId::NVarChar)
                    && max_len > PLP_ESCALATION_LIMIT
                {
                    TypeClass::Plp
                } else {
                    TypeClass::VarLen
                };
                Ok(Self { id, class, size })
            }
        }
    }
}
