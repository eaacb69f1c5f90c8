//! PRELOGIN message decoding.
//!
//! A PRELOGIN message is a table of `{token, offset, size}` triples
//! terminated by `0xFF`, with option data placed elsewhere in the
//! message at the given offsets. Only the VERSION and ENCRYPTION options
//! carry anything the event needs; the same walk decodes both the client
//! request and the server response.

use tds_wire::token::{EncryptionLevel, PreloginToken};
use tds_wire::{Cursor, DecodeError, DecodeResult, TdsVersion};

use crate::event::{SetValues, SqlEvent};

pub(crate) fn decode(cur: &mut Cursor<'_>, event: &mut SqlEvent) -> DecodeResult<()> {
    // Option offsets are relative to the start of the message.
    let msg_len = cur.remaining();
    let msg_start = *cur;

    loop {
        let token = cur.read_u8()?;
        if token == PreloginToken::Terminator as u8 {
            return Ok(());
        }
        let offset = cur.read_u16_be()? as usize;
        let size = cur.read_u16_be()? as usize;
        let consumed = msg_len - cur.remaining();
        // Data must start past the table bytes read so far (the
        // terminator is still unread) and end inside the capture.
        if size > 0 && (offset <= consumed || offset + size > msg_len) {
            return Err(DecodeError::Malformed("prelogin option offset"));
        }

        match PreloginToken::from_u8(token) {
            Some(PreloginToken::Version) => {
                if size != 6 {
                    return Err(DecodeError::Malformed("prelogin version size"));
                }
                let major = msg_start.peek_u8(offset)?;
                let minor = msg_start.peek_u8(offset + 1)?;
                // The remaining four bytes of the version blob are build
                // numbers nobody asks about.
                event.set_version(TdsVersion { major, minor });
            }
            Some(PreloginToken::Encryption) => {
                if size != 1 {
                    return Err(DecodeError::Malformed("prelogin encryption size"));
                }
                let raw = msg_start.peek_u8(offset)?;
                match EncryptionLevel::from_u8(raw) {
                    Some(level) if level.requests_ssl() => {
                        event.ssl_request = true;
                        event.set_values |= SetValues::SSL_REQUEST;
                    }
                    Some(_) => {}
                    None => return Err(DecodeError::Malformed("prelogin encryption level")),
                }
            }
            _ => {} // other options carry nothing the event reports
        }
    }
}
