//! Server response decoding: the token loop.
//!
//! Everything a server sends rides in a TabularResult message: a stream
//! of one-byte tokens, each followed by a token-specific body. What the
//! message *means* depends on what the client last asked; the flow keeps
//! that context and this module walks the stream, harvesting row counts,
//! errors, login acknowledgments and environment changes into the event.

use tracing::debug;

use tds_wire::codec::{append_b_varchar, append_us_varchar, skip_b_varchar};
use tds_wire::token::{EnvChangeType, TokenType, done_status};
use tds_wire::{
    Cursor, DecodeError, DecodeResult, PacketType, StringSink, TdsVersion, TypeId, TypeInfo,
    decode_value,
};

use crate::config::SessionConfig;
use crate::decode::prelogin;
use crate::event::{MsgType, RequestStatus, SessionEncoding, SetValues, SqlEvent};
use crate::flow::FlowState;

/// COLMETADATA column count meaning "no metadata follows".
const NO_METADATA: u16 = 0xFFFF;

enum Step {
    Continue,
    Stop,
}

pub(crate) fn decode(
    cur: &mut Cursor<'_>,
    state: &mut FlowState,
    event: &mut SqlEvent,
    config: &SessionConfig,
) -> DecodeResult<()> {
    // The response to a PRELOGIN is another PRELOGIN, not a token
    // stream; it can only be told apart by trying.
    if state.last_client_type == Some(PacketType::PreLogin) {
        let saved = *cur;
        if prelogin::decode(cur, event).is_ok() {
            return Ok(());
        }
        debug!("server message is not a prelogin response, trying the token stream");
        *cur = saved;
    }

    while !cur.is_empty() {
        match token(cur, state, event, config)? {
            Step::Continue => {}
            Step::Stop => break,
        }
    }
    Ok(())
}

fn token(
    cur: &mut Cursor<'_>,
    state: &mut FlowState,
    event: &mut SqlEvent,
    config: &SessionConfig,
) -> DecodeResult<Step> {
    let raw = cur.read_u8()?;
    let Some(token) = TokenType::from_u8(raw) else {
        debug!(token = raw, "unknown result token, stopping the message here");
        return Ok(Step::Stop);
    };

    match token {
        TokenType::Done | TokenType::DoneProc | TokenType::DoneInProc => {
            cur.check(8)?;
            let status = cur.read_u16_le()?;
            cur.skip(2)?; // current command
            // Row counts are 32-bit before 7.2. Mixed streams exist; if
            // exactly four bytes are left, trust them to be a 32-bit count.
            let row_count = if state.pre_7_2 || cur.remaining() == 4 {
                u64::from(cur.read_u32_le()?)
            } else {
                cur.read_u64_le()?
            };
            if status & done_status::DONE_COUNT_SET != 0 {
                event.set_row_count(row_count);
            }
            if status & done_status::DONE_MORE == 0 {
                // The DONE_ERROR flag is not reliable; an ERROR token
                // already claimed the status if there was one.
                event.set_request_status(RequestStatus::Complete);
            }
            Ok(Step::Continue)
        }

        TokenType::Error => {
            let length = cur.read_u16_le()? as usize;
            if length < 15 {
                return Err(DecodeError::Malformed("ERROR token length"));
            }
            let mut body = cur.take(length)?;
            // Only the first error of a message is reported.
            if !event.set_values.contains(SetValues::ERROR_CODE) {
                let code = body.read_u32_le()?;
                event.set_request_status(RequestStatus::Error);
                event.error_code = code;
                event.set_values |= SetValues::ERROR_CODE;
                body.skip(2)?; // state, class
                let mut sink = StringSink::with_capacity(config.error_capacity);
                append_us_varchar(&mut body, Some(&mut sink))?;
                event.error_message = sink.finish();
                event.set_values |= SetValues::ERROR_MESSAGE;
            }
            Ok(Step::Continue)
        }

        TokenType::Info | TokenType::Order => {
            let length = cur.read_u16_le()? as usize;
            cur.skip(length)?;
            Ok(Step::Continue)
        }

        TokenType::ReturnStatus => {
            cur.skip(4)?;
            Ok(Step::Continue)
        }

        TokenType::ReturnValue => {
            cur.skip(2)?; // parameter ordinal
            skip_b_varchar(cur)?; // parameter name
            // Status flag, user type (2 or 4 bytes by version), flags.
            let meta = 1 + if state.pre_7_2 { 2 } else { 4 } + 2;
            cur.skip(meta)?;
            let type_info = TypeInfo::parse(cur, state.pre_7_2)?;
            decode_value(cur, &type_info, None)?;
            Ok(Step::Continue)
        }

        TokenType::ColMetaData => {
            event.msg_type = MsgType::Query;
            let count = cur.read_u16_le()?;
            if count == NO_METADATA {
                // Same shape as the previous result set; nothing to do.
                return Ok(Step::Continue);
            }
            let count = count as usize;
            if count >= config.max_columns {
                return Err(DecodeError::TooManyColumns {
                    count,
                    limit: config.max_columns,
                });
            }
            event.add_field_count(count as u32);

            if !state.pre_7_2 {
                // Flows that start mid-conversation never saw the
                // LOGINACK. Probe the first descriptor: post-7.2 has a
                // 4-byte user type, so its type token sits at +6; with
                // the 2-byte legacy width the token sits at +4.
                cur.check(7)?;
                let legacy_probe = cur.peek_u8(4)?;
                let modern_probe = cur.peek_u8(6)?;
                if TypeId::is_type_token(legacy_probe) && !TypeId::is_type_token(modern_probe) {
                    debug!("column metadata shaped pre-7.2, switching the flow over");
                    state.pre_7_2 = true;
                }
            }

            let user_type_width = if state.pre_7_2 { 2 } else { 4 };
            let mut columns = Vec::with_capacity(count);
            for _ in 0..count {
                cur.skip(user_type_width + 2)?; // user type, flags
                let type_info = TypeInfo::parse(cur, state.pre_7_2)?;
                skip_b_varchar(cur)?; // column name
                columns.push(type_info);
            }
            // Commit only after the whole token parsed.
            state.columns = columns;
            Ok(Step::Continue)
        }

        TokenType::Row => {
            event.msg_type = MsgType::Query;
            for type_info in &state.columns {
                decode_value(cur, type_info, None)?;
            }
            event.add_row();
            Ok(Step::Continue)
        }

        TokenType::LoginAck => {
            event.msg_type = MsgType::Startup;
            let length = cur.read_u16_le()? as usize;
            if length < 10 {
                return Err(DecodeError::Malformed("LOGINACK length"));
            }
            let mut body = cur.take(length)?;
            body.skip(1)?; // interface
            let version = TdsVersion::from_loginack(body.read_u32_be()?);
            event.set_version(version);
            state.pre_7_2 = version.is_pre_7_2();
            debug!(%version, pre_7_2 = state.pre_7_2, "login acknowledged");
            // Program name and version are not reported.
            Ok(Step::Continue)
        }

        TokenType::EnvChange => {
            let length = cur.read_u16_le()? as usize;
            if length == 0 {
                return Err(DecodeError::Malformed("ENVCHANGE length"));
            }
            cur.check(length)?;
            let sub_type = cur.read_u8()?;
            match EnvChangeType::from_u8(sub_type) {
                Some(EnvChangeType::Database) => {
                    let mut sink = StringSink::with_capacity(config.name_capacity);
                    append_b_varchar(cur, Some(&mut sink))?;
                    event.dbname = sink.finish();
                    event.set_values |= SetValues::DBNAME;
                    skip_b_varchar(cur)?; // old database
                }
                Some(EnvChangeType::CharacterSet) => {
                    let mut sink = StringSink::with_capacity(16);
                    append_b_varchar(cur, Some(&mut sink))?;
                    let encoding = match sink.as_str() {
                        "ISO-8859-1" | "iso_1" => SessionEncoding::Latin1,
                        "UTF8" => SessionEncoding::Utf8,
                        other => {
                            debug!(charset = other, "unrecognised session character set");
                            SessionEncoding::Unknown
                        }
                    };
                    event.set_encoding(encoding);
                    skip_b_varchar(cur)?; // old character set
                }
                _ => {
                    // Sub-type byte already consumed.
                    cur.skip(length - 1)?;
                }
            }
            Ok(Step::Continue)
        }

        // Recognised but not decoded; their bodies are not all
        // self-describing, so the rest of the message is opaque.
        TokenType::AltMetaData
        | TokenType::AltRow
        | TokenType::ColInfo
        | TokenType::TabName
        | TokenType::SessionState
        | TokenType::NbcRow
        | TokenType::Offset
        | TokenType::Sspi
        | TokenType::FeatureExtAck => {
            debug!(?token, "undecoded result token, stopping the message here");
            Ok(Step::Stop)
        }
    }
}
