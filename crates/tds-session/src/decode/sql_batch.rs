//! SQL_BATCH message decoding.

use tds_wire::codec::looks_ucs2;
use tds_wire::{Cursor, DecodeResult, StringSink};

use crate::config::SessionConfig;
use crate::decode::skip_all_headers;
use crate::event::{SetValues, SqlEvent};

/// Decode a SQL batch: optional ALL_HEADERS, then the query text.
///
/// The text is nominally UCS-2, but captures of older clients carry
/// single-byte text here; the same guess as for `B_VARCHAR` payloads
/// applies, with the extra demand that UCS-2 text has even length.
pub(crate) fn decode(
    cur: &mut Cursor<'_>,
    event: &mut SqlEvent,
    config: &SessionConfig,
) -> DecodeResult<()> {
    skip_all_headers(cur)?;

    cur.check(2)?;
    let ucs2 = looks_ucs2(cur) && cur.remaining() % 2 == 0;
    let text = cur.read_bytes(cur.remaining())?;

    let mut sink = StringSink::with_capacity(config.sql_capacity);
    if ucs2 {
        sink.append_ucs2(text);
    } else {
        sink.append_single_byte(text);
    }
    event.sql = sink.finish();
    event.set_values |= SetValues::SQL;
    Ok(())
}
