//! LOGIN7 message decoding.
//!
//! The LOGIN7 request opens with a fixed-size section (total length,
//! negotiated version request, client identifiers, option flags), then a
//! table of `(offset, length-in-characters)` pairs locating UCS-2 string
//! fields elsewhere in the message. The event wants the user name, the
//! password field (still scrambled on the wire) and the database name;
//! OptionFlags1 is kept on the flow because it governs how later string
//! fields would have to be decoded.

use tds_wire::{Cursor, DecodeError, DecodeResult, SqlText, StringSink};

use crate::config::SessionConfig;
use crate::event::{SetValues, SqlEvent};
use crate::flow::FlowState;

/// Offset of OptionFlags1 within the fixed section.
const OPTION_FLAGS1_OFFSET: usize = 24;
/// Size of the fixed section before the offset/length table.
const FIXED_SECTION_SIZE: usize = 36;

pub(crate) fn decode(
    cur: &mut Cursor<'_>,
    state: &mut FlowState,
    event: &mut SqlEvent,
    config: &SessionConfig,
) -> DecodeResult<()> {
    let msg_len = cur.remaining();
    let msg_start = *cur;

    let total_length = cur.read_u32_le()? as usize;
    if total_length < FIXED_SECTION_SIZE || total_length > msg_len {
        return Err(DecodeError::Malformed("LOGIN7 total length"));
    }

    cur.skip(OPTION_FLAGS1_OFFSET - 4)?;
    state.option_flags1 = cur.read_u8()?;
    // OptionFlags2, TypeFlags, OptionFlags3, timezone, LCID.
    cur.skip(FIXED_SECTION_SIZE - OPTION_FLAGS1_OFFSET - 1)?;

    // Offset/length pairs, in wire order.
    skip_field(cur)?; // HostName
    event.user = extract_string(cur, &msg_start, msg_len, config.name_capacity, false)?;
    event.set_values |= SetValues::USER;
    event.passwd = extract_string(cur, &msg_start, msg_len, config.name_capacity, true)?;
    event.set_values |= SetValues::PASSWD;
    skip_field(cur)?; // AppName
    skip_field(cur)?; // ServerName
    skip_field(cur)?; // Extension
    skip_field(cur)?; // ClientInterfaceName
    skip_field(cur)?; // Language
    event.dbname = extract_string(cur, &msg_start, msg_len, config.name_capacity, false)?;
    event.set_values |= SetValues::DBNAME;

    Ok(())
}

fn skip_field(cur: &mut Cursor<'_>) -> DecodeResult<()> {
    cur.skip(4)
}

/// Read one offset/length pair and pull the UCS-2 field it points at.
///
/// `raw` keeps the bytes as-is instead of UCS-2-decoding them; the
/// password field is scrambled on the wire and descrambling is a known
/// gap, so its bytes are carried through leniently.
fn extract_string(
    cur: &mut Cursor<'_>,
    msg_start: &Cursor<'_>,
    msg_len: usize,
    capacity: usize,
    raw: bool,
) -> DecodeResult<SqlText> {
    let offset = cur.read_u16_le()? as usize;
    let chars = cur.read_u16_le()? as usize;
    let byte_len = chars * 2;
    let consumed = msg_len - cur.remaining();
    if byte_len > 0 && (offset < consumed || offset + byte_len > msg_len) {
        return Err(DecodeError::Malformed("LOGIN7 field offset"));
    }

    let mut sink = StringSink::with_capacity(capacity);
    if byte_len > 0 {
        let mut field = *msg_start;
        field.skip(offset)?;
        let bytes = field.read_bytes(byte_len)?;
        if raw {
            sink.append_single_byte(bytes);
        } else {
            sink.append_ucs2(bytes);
        }
    }
    Ok(sink.finish())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::event::{MsgType, Timestamp};

    fn ucs2(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    /// Build a LOGIN7 message with the fields the decoder walks.
    fn login7(user: &str, passwd: &[u8], dbname: &str) -> Vec<u8> {
        let mut data_offset = FIXED_SECTION_SIZE + 9 * 4;
        let mut data = Vec::new();
        let mut pairs = Vec::new();
        let mut push_pair = |data: &mut Vec<u8>, pairs: &mut Vec<u8>, bytes: &[u8]| {
            pairs.extend_from_slice(&(data_offset as u16).to_le_bytes());
            pairs.extend_from_slice(&((bytes.len() / 2) as u16).to_le_bytes());
            data.extend_from_slice(bytes);
            data_offset += bytes.len();
        };

        push_pair(&mut data, &mut pairs, &ucs2("host"));
        push_pair(&mut data, &mut pairs, &ucs2(user));
        push_pair(&mut data, &mut pairs, passwd);
        push_pair(&mut data, &mut pairs, &ucs2("app"));
        push_pair(&mut data, &mut pairs, &ucs2("server"));
        push_pair(&mut data, &mut pairs, &[]);
        push_pair(&mut data, &mut pairs, &ucs2("ODBC"));
        push_pair(&mut data, &mut pairs, &[]);
        push_pair(&mut data, &mut pairs, &ucs2(dbname));

        let mut msg = Vec::new();
        msg.extend_from_slice(&(data_offset as u32).to_le_bytes());
        msg.extend_from_slice(&[0u8; 16]); // version, packet size, prog ver, pid
        msg.extend_from_slice(&[0u8; 4]); // connection id
        msg.push(0xE0); // OptionFlags1
        msg.extend_from_slice(&[0u8; 11]); // flags2..LCID
        msg.extend_from_slice(&pairs);
        msg.extend_from_slice(&data);
        msg
    }

    #[test]
    fn extracts_user_password_and_database() {
        let bytes = login7("sa", &[0xA5, 0xA5, 0x5A, 0x5A], "master");
        let mut cur = Cursor::new(&bytes);
        let mut state = FlowState::default();
        let mut event = SqlEvent::new(MsgType::Startup, true, Timestamp(0));
        decode(&mut cur, &mut state, &mut event, &SessionConfig::default()).unwrap();

        assert_eq!(event.user.text, "sa");
        assert_eq!(event.dbname.text, "master");
        assert!(event.set_values.contains(SetValues::USER));
        assert!(event.set_values.contains(SetValues::PASSWD));
        assert!(event.set_values.contains(SetValues::DBNAME));
        assert!(!event.passwd.text.is_empty());
        assert_eq!(state.option_flags1, 0xE0);
    }

    #[test]
    fn truncated_fixed_section_is_too_short() {
        let bytes = login7("sa", &[0, 0], "db");
        let mut cur = Cursor::new(&bytes[..20]);
        let mut state = FlowState::default();
        let mut event = SqlEvent::new(MsgType::Startup, true, Timestamp(0));
        let err = decode(&mut cur, &mut state, &mut event, &SessionConfig::default());
        assert!(err.is_err());
    }

    #[test]
    fn lying_total_length_is_malformed() {
        let mut bytes = login7("sa", &[0, 0], "db");
        let huge = (bytes.len() as u32 + 100).to_le_bytes();
        bytes[..4].copy_from_slice(&huge);
        let mut cur = Cursor::new(&bytes);
        let mut state = FlowState::default();
        let mut event = SqlEvent::new(MsgType::Startup, true, Timestamp(0));
        assert_eq!(
            decode(&mut cur, &mut state, &mut event, &SessionConfig::default()),
            Err(DecodeError::Malformed("LOGIN7 total length"))
        );
    }

    #[test]
    fn field_offset_outside_capture_is_malformed() {
        let mut bytes = login7("sa", &[0, 0], "db");
        // Point the UserName field past the end of the message.
        let user_pair = FIXED_SECTION_SIZE + 4;
        bytes[user_pair..user_pair + 2].copy_from_slice(&0xFFF0u16.to_le_bytes());
        let mut cur = Cursor::new(&bytes);
        let mut state = FlowState::default();
        let mut event = SqlEvent::new(MsgType::Startup, true, Timestamp(0));
        assert_eq!(
            decode(&mut cur, &mut state, &mut event, &SessionConfig::default()),
            Err(DecodeError::Malformed("LOGIN7 field offset"))
        );
    }
}
