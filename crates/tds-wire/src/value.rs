//! Value decoding driven by a parsed [`TypeInfo`].
//!
//! One entry point handles both rendering and skipping: passing no sink
//! consumes exactly the same bytes as rendering would, which is what lets
//! ROW tokens skip values they do not care about without losing their
//! place in the stream.

use core::cmp::min;
use core::fmt::Write;

use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};
use crate::sink::StringSink;
use crate::types::{TypeClass, TypeInfo};

/// PLP sentinel: the value is NULL.
const PLP_NULL: u64 = 0xFFFF_FFFF_FFFF_FFFF;
/// PLP sentinel: total length unknown, trust the terminator chunk.
const PLP_UNKNOWN_LEN: u64 = 0xFFFF_FFFF_FFFF_FFFE;

/// Decode one value described by `info`, rendering into `sink` when one
/// is given.
///
/// Returns whether the value was NULL. Truncated captures render what is
/// available and then fail with a `TooShort` error; malformed lengths
/// fail without rendering further.
pub fn decode_value(
    cur: &mut Cursor<'_>,
    info: &TypeInfo,
    mut sink: Option<&mut StringSink>,
) -> DecodeResult<bool> {
    match info.class {
        TypeClass::Zero => {
            if let Some(sink) = sink {
                sink.append_str("NULL");
            }
            Ok(true)
        }

        TypeClass::Fixed => {
            let value = cur.read_fixed_uint_le(info.size)?;
            if let Some(sink) = sink {
                let _ = write!(sink, "{value}");
            }
            Ok(false)
        }

        TypeClass::VarLen => {
            let mut length = cur.read_fixed_uint_le(info.size)? as usize;
            // The 2- and 4-byte prefixes reserve their all-ones value as
            // the NULL sentinel; a plain zero length is NULL everywhere.
            if (info.size == 2 && length == 0xFFFF) || (info.size == 4 && length == 0xFFFF_FFFF) {
                length = 0;
            }
            if length == 0 {
                if let Some(sink) = sink {
                    sink.append_str("NULL");
                }
                return Ok(true);
            }

            // Render as much as the capture holds.
            let truncated = cur.remaining() < length;
            let available = min(length, cur.remaining());
            if info.id.is_text() {
                let bytes = cur.read_bytes(available)?;
                if let Some(sink) = sink {
                    if info.id.is_unicode_text() {
                        sink.append_ucs2(bytes);
                    } else {
                        sink.append_single_byte(bytes);
                    }
                }
            } else if !truncated && available <= 8 {
                let value = cur.read_fixed_uint_le(available)?;
                if let Some(sink) = sink {
                    let _ = write!(sink, "{value}");
                }
            } else {
                let bytes = cur.read_bytes(available)?;
                if let Some(sink) = sink {
                    sink.append_hex(bytes);
                }
            }
            if truncated {
                return Err(DecodeError::TooShort {
                    needed: length,
                    available,
                });
            }
            Ok(false)
        }

        TypeClass::VarCount => {
            let mut count = cur.read_u16_be()?;
            if count == 0xFFFF {
                count = 0;
            }
            let _ = count;
            Err(DecodeError::VariableCount)
        }

        TypeClass::Plp => {
            let total = cur.read_u64_le()?;
            if total == PLP_NULL {
                if let Some(sink) = sink {
                    sink.append_str("NULL");
                }
                return Ok(true);
            }

            // Chunks until a zero-length terminator, bounded by the
            // declared total unless the total itself is unknown.
            let mut remaining = total;
            loop {
                let chunk = u64::from(cur.read_u32_le()?);
                if chunk == 0 {
                    break;
                }
                if remaining != PLP_UNKNOWN_LEN && chunk > remaining {
                    return Err(DecodeError::PlpChunkOverrun { chunk, remaining });
                }
                let bytes = cur.read_bytes(chunk as usize)?;
                if let Some(sink) = sink.as_deref_mut() {
                    if info.id.is_text() {
                        if info.id.is_unicode_text() {
                            sink.append_ucs2(bytes);
                        } else {
                            sink.append_single_byte(bytes);
                        }
                    } else {
                        sink.append_hex(bytes);
                    }
                }
                if remaining != PLP_UNKNOWN_LEN {
                    remaining -= chunk;
                }
            }
            Ok(false)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::TypeId;

    fn info(id: TypeId, class: TypeClass, size: usize) -> TypeInfo {
        TypeInfo { id, class, size }
    }

    fn render(bytes: &[u8], info: &TypeInfo) -> (String, DecodeResult<bool>, usize) {
        let mut cur = Cursor::new(bytes);
        let mut sink = StringSink::with_capacity(256);
        let res = decode_value(&mut cur, info, Some(&mut sink));
        (sink.finish().text, res, bytes.len() - cur.remaining())
    }

    #[test]
    fn fixed_renders_decimal() {
        let ti = info(TypeId::Int4, TypeClass::Fixed, 4);
        let (text, res, used) = render(&[0x2A, 0, 0, 0], &ti);
        assert_eq!(text, "42");
        assert_eq!(res, Ok(false));
        assert_eq!(used, 4);
    }

    #[test]
    fn zero_length_is_null() {
        let ti = info(TypeId::Null, TypeClass::Zero, 0);
        let (text, res, used) = render(&[], &ti);
        assert_eq!(text, "NULL");
        assert_eq!(res, Ok(true));
        assert_eq!(used, 0);
    }

    #[test]
    fn varlen_null_sentinels() {
        let two = info(TypeId::NVarChar, TypeClass::VarLen, 2);
        let (text, res, _) = render(&[0xFF, 0xFF], &two);
        assert_eq!(text, "NULL");
        assert_eq!(res, Ok(true));

        let four = info(TypeId::Text, TypeClass::VarLen, 4);
        let (text, res, _) = render(&[0xFF, 0xFF, 0xFF, 0xFF], &four);
        assert_eq!(text, "NULL");
        assert_eq!(res, Ok(true));
    }

    #[test]
    fn varlen_unicode_text() {
        let ti = info(TypeId::NVarChar, TypeClass::VarLen, 2);
        let (text, res, _) = render(&[0x04, 0x00, b'h', 0, b'i', 0], &ti);
        assert_eq!(text, "hi");
        assert_eq!(res, Ok(false));
    }

    #[test]
    fn varlen_small_binary_renders_decimal() {
        let ti = info(TypeId::IntN, TypeClass::VarLen, 1);
        let (text, res, _) = render(&[0x04, 0x07, 0, 0, 0], &ti);
        assert_eq!(text, "7");
        assert_eq!(res, Ok(false));
    }

    #[test]
    fn varlen_large_binary_renders_hex() {
        let ti = info(TypeId::BigVarBinary, TypeClass::VarLen, 2);
        let mut bytes = vec![0x09, 0x00];
        bytes.extend_from_slice(&[0xAB; 9]);
        let (text, res, _) = render(&bytes, &ti);
        assert_eq!(text, "0xababababababababab");
        assert_eq!(res, Ok(false));
    }

    #[test]
    fn varlen_truncation_renders_partial() {
        let ti = info(TypeId::NVarChar, TypeClass::VarLen, 2);
        // Declares 8 bytes, capture holds 4.
        let (text, res, used) = render(&[0x08, 0x00, b'h', 0, b'i', 0], &ti);
        assert_eq!(text, "hi");
        assert!(res.unwrap_err().is_too_short());
        assert_eq!(used, 6);
    }

    #[test]
    fn skip_consumes_exactly_like_render() {
        let cases: &[(&[u8], TypeInfo)] = &[
            (&[0x2A, 0, 0, 0], info(TypeId::Int4, TypeClass::Fixed, 4)),
            (
                &[0x04, 0x00, b'h', 0, b'i', 0],
                info(TypeId::NVarChar, TypeClass::VarLen, 2),
            ),
            (
                &[
                    0x06, 0, 0, 0, 0, 0, 0, 0, // total 6
                    0x06, 0, 0, 0, b'a', 0, b'b', 0, b'c', 0, // one chunk
                    0x00, 0x00, 0x00, 0x00, // terminator
                ],
                info(TypeId::NVarChar, TypeClass::Plp, 2),
            ),
        ];
        for (bytes, ti) in cases {
            let mut rendered = Cursor::new(bytes);
            let mut skipped = Cursor::new(bytes);
            let mut sink = StringSink::with_capacity(256);
            decode_value(&mut rendered, ti, Some(&mut sink)).unwrap();
            decode_value(&mut skipped, ti, None).unwrap();
            assert_eq!(rendered.remaining(), skipped.remaining());
        }
    }

    #[test]
    fn plp_null_sentinel() {
        let ti = info(TypeId::NVarChar, TypeClass::Plp, 2);
        let (text, res, used) = render(&[0xFF; 8], &ti);
        assert_eq!(text, "NULL");
        assert_eq!(res, Ok(true));
        assert_eq!(used, 8);
    }

    #[test]
    fn plp_stops_at_declared_total() {
        let ti = info(TypeId::NVarChar, TypeClass::Plp, 2);
        let bytes = [
            0x04, 0, 0, 0, 0, 0, 0, 0, // total 4
            0x04, 0, 0, 0, b'o', 0, b'k', 0, // chunk of 4
            0x00, 0x00, 0x00, 0x00, // terminator
            0xEE, // unrelated trailing byte
        ];
        let (text, res, used) = render(&bytes, &ti);
        assert_eq!(text, "ok");
        assert_eq!(res, Ok(false));
        assert_eq!(used, bytes.len() - 1);
    }

    #[test]
    fn plp_early_terminator_wins() {
        let ti = info(TypeId::NVarChar, TypeClass::Plp, 2);
        let bytes = [
            0x10, 0, 0, 0, 0, 0, 0, 0, // total 16, never reached
            0x02, 0, 0, 0, b'a', 0, // chunk of 2
            0x00, 0x00, 0x00, 0x00, // terminator
        ];
        let (text, res, used) = render(&bytes, &ti);
        assert_eq!(text, "a");
        assert_eq!(res, Ok(false));
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn plp_unknown_length_trusts_terminator() {
        let ti = info(TypeId::NVarChar, TypeClass::Plp, 2);
        let bytes = [
            0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // unknown total
            0x02, 0, 0, 0, b'a', 0, // chunk
            0x02, 0, 0, 0, b'b', 0, // chunk
            0x00, 0x00, 0x00, 0x00, // terminator
        ];
        let (text, res, _) = render(&bytes, &ti);
        assert_eq!(text, "ab");
        assert_eq!(res, Ok(false));
    }

    #[test]
    fn plp_chunk_overrunning_total_is_malformed() {
        let ti = info(TypeId::NVarChar, TypeClass::Plp, 2);
        let bytes = [
            0x02, 0, 0, 0, 0, 0, 0, 0, // total 2
            0x04, 0, 0, 0, b'a', 0, b'b', 0, // chunk of 4 > total
        ];
        let (_, res, _) = render(&bytes, &ti);
        assert_eq!(
            res,
            Err(DecodeError::PlpChunkOverrun {
                chunk: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn variable_count_is_rejected() {
        let ti = info(TypeId::Int4, TypeClass::VarCount, 0);
        let (_, res, used) = render(&[0xFF, 0xFF], &ti);
        assert_eq!(res, Err(DecodeError::VariableCount));
        assert_eq!(used, 2);
    }
}
