//! Message decoders, one per TDS packet type.

pub(crate) mod login7;
pub(crate) mod prelogin;
pub(crate) mod result;
pub(crate) mod rpc;
pub(crate) mod sql_batch;

use tds_wire::{Cursor, DecodeError};

/// Skip the optional ALL_HEADERS prefix of SQL_BATCH and RPC messages.
///
/// The headers are only sometimes present; in practice single-packet
/// requests often omit them. The established dissector heuristic: peek
/// the would-be total length and treat anything over 0x100 as the start
/// of the actual payload instead.
pub(crate) fn skip_all_headers(cur: &mut Cursor<'_>) -> Result<(), DecodeError> {
    let total_length = cur.peek_u32_le(0)? as usize;
    if total_length > 0x100 {
        return Ok(());
    }
    if total_length < 4 {
        return Err(DecodeError::Malformed("ALL_HEADERS length"));
    }
    cur.skip(total_length)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn present_headers_are_dropped() {
        // Total length 8 covering itself plus four header bytes.
        let bytes = [0x08, 0, 0, 0, 0xAA, 0xBB, 0xCC, 0xDD, 0x51];
        let mut cur = Cursor::new(&bytes);
        skip_all_headers(&mut cur).unwrap();
        assert_eq!(cur.remaining(), 1);
    }

    #[test]
    fn large_first_word_means_no_headers() {
        // UCS-2 "SEL..." starts with 0x53 0x00 0x45 0x00 = 0x00450053 > 0x100.
        let bytes = [0x53, 0x00, 0x45, 0x00];
        let mut cur = Cursor::new(&bytes);
        skip_all_headers(&mut cur).unwrap();
        assert_eq!(cur.remaining(), 4);
    }

    #[test]
    fn undersized_headers_are_malformed() {
        let bytes = [0x03, 0, 0, 0];
        let mut cur = Cursor::new(&bytes);
        assert_eq!(
            skip_all_headers(&mut cur),
            Err(DecodeError::Malformed("ALL_HEADERS length"))
        );
    }
}
