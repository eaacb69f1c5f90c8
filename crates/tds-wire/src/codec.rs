//! Length-prefixed string forms.
//!
//! TDS carries names and messages as `B_VARCHAR` (one-byte character
//! count) and `US_VARCHAR` (two-byte character count) fields. The
//! two-byte form is always UCS-2. The one-byte form is nominally UCS-2
//! too, but captures of older clients carry single-byte text in the same
//! position, so the decoder guesses: if the next-but-one byte is zero the
//! payload is treated as UCS-2. Crude, but stable in practice.

use crate::cursor::Cursor;
use crate::error::DecodeResult;
use crate::sink::StringSink;

/// Whether the string payload starting at the cursor looks UCS-2 encoded.
#[must_use]
pub fn looks_ucs2(cur: &Cursor<'_>) -> bool {
    matches!(cur.peek_u8(1), Ok(0x00))
}

/// Read a `B_VARCHAR`, appending it to `sink` when one is given.
///
/// Returns whether the field held any characters. Skipping (no sink)
/// consumes exactly as many bytes as rendering.
pub fn append_b_varchar(cur: &mut Cursor<'_>, sink: Option<&mut StringSink>) -> DecodeResult<bool> {
    cur.check(3)?;
    let char_count = cur.read_u8()? as usize;
    let ucs2 = looks_ucs2(cur);
    let byte_count = if ucs2 { char_count * 2 } else { char_count };
    let bytes = cur.read_bytes(byte_count)?;
    if let Some(sink) = sink {
        if char_count > 0 {
            if ucs2 {
                sink.append_ucs2(bytes);
            } else {
                sink.append_single_byte(bytes);
            }
        }
    }
    Ok(char_count > 0)
}

/// Consume a `B_VARCHAR` without rendering it.
pub fn skip_b_varchar(cur: &mut Cursor<'_>) -> DecodeResult<()> {
    append_b_varchar(cur, None).map(|_| ())
}

/// Read a `US_VARCHAR` (always UCS-2), appending it to `sink` when one
/// is given.
pub fn append_us_varchar(cur: &mut Cursor<'_>, sink: Option<&mut StringSink>) -> DecodeResult<()> {
    let char_count = cur.read_u16_le()? as usize;
    let bytes = cur.read_bytes(char_count * 2)?;
    if let Some(sink) = sink {
        sink.append_ucs2(bytes);
    }
    Ok(())
}

/// Consume a `US_VARCHAR` without rendering it.
pub fn skip_us_varchar(cur: &mut Cursor<'_>) -> DecodeResult<()> {
    append_us_varchar(cur, None)
}
