//! RPC request decoding.
//!
//! An RPC message carries one or more request batches, each naming a
//! procedure (by name or by well-known id) followed by its parameters.
//! The decoder renders the whole call into the SQL field the way a
//! client would have written it: `Sp_ExecuteSql @stmt=N'...',@x=7`.

use tds_wire::codec::{append_b_varchar, append_us_varchar};
use tds_wire::{Cursor, DecodeError, DecodeResult, StringSink, TypeId, TypeInfo, decode_value};

use crate::config::SessionConfig;
use crate::decode::skip_all_headers;
use crate::event::{SetValues, SqlEvent};
use crate::flow::FlowState;

/// Rendering room for one parameter value before it joins the SQL text.
const PARAM_CAPACITY: usize = 4096;

/// Well-known stored procedure ids carried instead of a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ProcId {
    /// sp_cursor (0x0001)
    Cursor = 0x0001,
    /// sp_cursoropen (0x0002)
    CursorOpen = 0x0002,
    /// sp_cursorprepare (0x0003)
    CursorPrepare = 0x0003,
    /// sp_cursorexecute (0x0004)
    CursorExecute = 0x0004,
    /// sp_cursorprepexec (0x0005)
    CursorPrepExec = 0x0005,
    /// sp_cursorunprepare (0x0006)
    CursorUnprepare = 0x0006,
    /// sp_cursorfetch (0x0007)
    CursorFetch = 0x0007,
    /// sp_cursoroption (0x0008)
    CursorOption = 0x0008,
    /// sp_cursorclose (0x0009)
    CursorClose = 0x0009,
    /// sp_executesql (0x000A)
    ExecuteSql = 0x000A,
    /// sp_prepare (0x000B)
    Prepare = 0x000B,
    /// sp_execute (0x000C)
    Execute = 0x000C,
    /// sp_prepexec (0x000D)
    PrepExec = 0x000D,
    /// sp_prepexecrpc (0x000E)
    PrepExecRpc = 0x000E,
    /// sp_unprepare (0x000F)
    Unprepare = 0x000F,
}

impl ProcId {
    /// Create from the raw wire id.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::Cursor),
            0x0002 => Some(Self::CursorOpen),
            0x0003 => Some(Self::CursorPrepare),
            0x0004 => Some(Self::CursorExecute),
            0x0005 => Some(Self::CursorPrepExec),
            0x0006 => Some(Self::CursorUnprepare),
            0x0007 => Some(Self::CursorFetch),
            0x0008 => Some(Self::CursorOption),
            0x0009 => Some(Self::CursorClose),
            0x000A => Some(Self::ExecuteSql),
            0x000B => Some(Self::Prepare),
            0x000C => Some(Self::Execute),
            0x000D => Some(Self::PrepExec),
            0x000E => Some(Self::PrepExecRpc),
            0x000F => Some(Self::Unprepare),
            _ => None,
        }
    }

    /// Display name used in the rendered SQL.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cursor => "Sp_Cursor",
            Self::CursorOpen => "Sp_CursorOpen",
            Self::CursorPrepare => "Sp_CursorPrepare",
            Self::CursorExecute => "Sp_CursorExecute",
            Self::CursorPrepExec => "Sp_CursorPrepExec",
            Self::CursorUnprepare => "Sp_CursorUnprepare",
            Self::CursorFetch => "Sp_CursorFetch",
            Self::CursorOption => "Sp_CursorOption",
            Self::CursorClose => "Sp_CursorClose",
            Self::ExecuteSql => "Sp_ExecuteSql",
            Self::Prepare => "Sp_Prepare",
            Self::Execute => "Sp_Execute",
            Self::PrepExec => "Sp_PrepExec",
            Self::PrepExecRpc => "Sp_PrepExecRpc",
            Self::Unprepare => "Sp_Unprepare",
        }
    }
}

/// Sentinel in NameLenProcID selecting the well-known id form.
const PROC_ID_SWITCH: u16 = 0xFFFF;

pub(crate) fn decode(
    cur: &mut Cursor<'_>,
    state: &FlowState,
    event: &mut SqlEvent,
    config: &SessionConfig,
) -> DecodeResult<()> {
    let mut sink = StringSink::with_capacity(config.sql_capacity);

    let result: DecodeResult<()> = (|| {
        skip_all_headers(cur)?;
        while !cur.is_empty() {
            request_batch(cur, state, &mut sink, event)?;
            batch_flags(cur)?;
        }
        Ok(())
    })();

    let mut sql = sink.finish();
    if matches!(&result, Err(e) if e.is_too_short()) {
        sql.truncated = true;
    }
    event.sql = sql;
    result
}

fn request_batch(
    cur: &mut Cursor<'_>,
    state: &FlowState,
    sink: &mut StringSink,
    event: &mut SqlEvent,
) -> DecodeResult<()> {
    let name_len = cur.peek_u16_le(0)?;
    if name_len == PROC_ID_SWITCH {
        cur.skip(2)?;
        let raw_id = cur.read_u16_le()?;
        let proc = ProcId::from_u16(raw_id).ok_or(DecodeError::UnknownProcId(raw_id))?;
        sink.append_str(proc.name());
    } else {
        append_us_varchar(cur, Some(&mut *sink))?;
    }
    event.set_values |= SetValues::SQL;

    // Option flags: fWithRecomp, fNoMetaData, fReuseMetaData.
    cur.skip(2)?;

    sink.append_str(" ");
    let mut first = true;
    while !cur.is_empty() {
        let next = cur.peek_u8(0)?;
        if next == 0x80 || next >= 0xFE {
            break; // end of this batch's parameters
        }
        if first {
            first = false;
        } else {
            sink.append_char(',');
        }
        parameter(cur, state, sink)?;
    }
    Ok(())
}

/// Separator between request batches; the last one is optional.
fn batch_flags(cur: &mut Cursor<'_>) -> DecodeResult<()> {
    if cur.is_empty() {
        return Ok(());
    }
    let flag = cur.read_u8()?;
    if flag != 0x80 && flag < 0xFE {
        return Err(DecodeError::Malformed("RPC batch separator"));
    }
    Ok(())
}

/// One parameter: name, status flag, type info, value.
fn parameter(cur: &mut Cursor<'_>, state: &FlowState, sink: &mut StringSink) -> DecodeResult<()> {
    let had_name = append_b_varchar(cur, Some(&mut *sink))?;
    let _status_flag = cur.read_u8()?;
    if had_name {
        sink.append_char('=');
    }

    let type_info = TypeInfo::parse(cur, state.pre_7_2)?;
    let mut rendered = StringSink::with_capacity(PARAM_CAPACITY);
    let outcome = decode_value(cur, &type_info, Some(&mut rendered));
    let rendered = rendered.finish();

    if matches!(outcome, Ok(true)) {
        // NULL goes in bare, never quoted.
        sink.append_str(&rendered.text);
        return Ok(());
    }
    let too_short = matches!(&outcome, Err(e) if e.is_too_short());

    match type_info.id {
        TypeId::Xml | TypeId::NChar | TypeId::NText | TypeId::NVarChar => {
            sink.append_char('N');
            quote(sink, &rendered.text, too_short);
        }
        TypeId::VarChar
        | TypeId::Text
        | TypeId::Char
        | TypeId::BigBinary
        | TypeId::BigChar
        | TypeId::BigVarChar => quote(sink, &rendered.text, too_short),
        _ => sink.append_str(&rendered.text),
    }
    outcome.map(|_| ())
}

fn quote(sink: &mut StringSink, text: &str, too_short: bool) {
    sink.append_char('\'');
    sink.append_quoted_escaped(text, '\'');
    // A value cut off by the capture gets no closing quote; the
    // truncation marker carries the caveat instead.
    if !too_short {
        sink.append_char('\'');
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::event::{MsgType, Timestamp};

    fn ucs2(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    fn decode_rpc(bytes: &[u8]) -> (SqlEvent, DecodeResult<()>) {
        let mut cur = Cursor::new(bytes);
        let state = FlowState::default();
        let mut event = SqlEvent::new(MsgType::Query, true, Timestamp(0));
        let res = decode(&mut cur, &state, &mut event, &SessionConfig::default());
        (event, res)
    }

    /// `sp_executesql N'SELECT @x', @x int = 7` as a client would send it.
    fn execute_sql_message() -> Vec<u8> {
        let mut msg = Vec::new();
        msg.extend_from_slice(&[0xFF, 0xFF]); // NameLenProcID: well-known id
        msg.extend_from_slice(&0x000Au16.to_le_bytes()); // Sp_ExecuteSql
        msg.extend_from_slice(&[0x00, 0x00]); // option flags

        // @stmt nvarchar: b_varchar name, status, TYPE_INFO, value
        let stmt = ucs2("SELECT @x");
        msg.push(5);
        msg.extend_from_slice(&ucs2("@stmt"));
        msg.push(0x00);
        msg.push(0xE7); // NVARCHAR
        msg.extend_from_slice(&0x1F40u16.to_le_bytes()); // max 8000 bytes
        msg.extend_from_slice(&[0x09, 0x04, 0xD0, 0x00, 0x34]); // collation
        msg.extend_from_slice(&(stmt.len() as u16).to_le_bytes());
        msg.extend_from_slice(&stmt);

        // @x int4 = 7
        msg.push(2);
        msg.extend_from_slice(&ucs2("@x"));
        msg.push(0x00);
        msg.push(0x38); // INT4
        msg.extend_from_slice(&7u32.to_le_bytes());
        msg
    }

    #[test]
    fn renders_execute_sql_call() {
        let (event, res) = decode_rpc(&execute_sql_message());
        res.unwrap();
        assert_eq!(event.sql.text, "Sp_ExecuteSql @stmt=N'SELECT @x',@x=7");
        assert!(!event.sql.truncated);
        assert!(event.set_values.contains(SetValues::SQL));
    }

    #[test]
    fn named_procedure_via_us_varchar() {
        let mut msg = Vec::new();
        msg.extend_from_slice(&8u16.to_le_bytes()); // 8 characters
        msg.extend_from_slice(&ucs2("dbo.mine"));
        msg.extend_from_slice(&[0x00, 0x00]); // option flags
        let (event, res) = decode_rpc(&msg);
        res.unwrap();
        assert_eq!(event.sql.text, "dbo.mine ");
    }

    #[test]
    fn unknown_proc_id_is_rejected() {
        let mut msg = Vec::new();
        msg.extend_from_slice(&[0xFF, 0xFF]);
        msg.extend_from_slice(&0x0042u16.to_le_bytes());
        let (_, res) = decode_rpc(&msg);
        assert_eq!(res, Err(DecodeError::UnknownProcId(0x42)));
    }

    #[test]
    fn null_parameter_is_not_quoted() {
        let mut msg = Vec::new();
        msg.extend_from_slice(&[0xFF, 0xFF]);
        msg.extend_from_slice(&0x000Cu16.to_le_bytes()); // Sp_Execute
        msg.extend_from_slice(&[0x00, 0x00]);
        msg.push(2);
        msg.extend_from_slice(&ucs2("@p"));
        msg.push(0x00);
        msg.push(0xE7); // NVARCHAR
        msg.extend_from_slice(&0x1F40u16.to_le_bytes());
        msg.extend_from_slice(&[0, 0, 0, 0, 0]);
        msg.extend_from_slice(&[0xFF, 0xFF]); // NULL sentinel
        let (event, res) = decode_rpc(&msg);
        res.unwrap();
        assert_eq!(event.sql.text, "Sp_Execute @p=NULL");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let text = ucs2("it's");
        let mut msg = Vec::new();
        msg.extend_from_slice(&[0xFF, 0xFF]);
        msg.extend_from_slice(&0x000Au16.to_le_bytes());
        msg.extend_from_slice(&[0x00, 0x00]);
        msg.push(0); // nameless parameter
        msg.push(0x00);
        msg.push(0xE7);
        msg.extend_from_slice(&0x1F40u16.to_le_bytes());
        msg.extend_from_slice(&[0, 0, 0, 0, 0]);
        msg.extend_from_slice(&(text.len() as u16).to_le_bytes());
        msg.extend_from_slice(&text);
        let (event, res) = decode_rpc(&msg);
        res.unwrap();
        assert_eq!(event.sql.text, "Sp_ExecuteSql N'it''s'");
    }

    #[test]
    fn truncated_value_loses_closing_quote() {
        let mut msg = execute_sql_message();
        // Chop the capture inside @stmt's value.
        msg.truncate(msg.len() - 24);
        let (event, res) = decode_rpc(&msg);
        assert!(res.unwrap_err().is_too_short());
        assert!(event.sql.truncated);
        assert!(event.sql.text.starts_with("Sp_ExecuteSql @stmt=N'"));
        assert!(!event.sql.text.ends_with('\''));
    }

    #[test]
    fn two_batches_separated_by_flag() {
        let mut msg = Vec::new();
        for id in [0x000Bu16, 0x000F] {
            msg.extend_from_slice(&[0xFF, 0xFF]);
            msg.extend_from_slice(&id.to_le_bytes());
            msg.extend_from_slice(&[0x00, 0x00]);
            msg.push(0x80); // batch separator
        }
        let (event, res) = decode_rpc(&msg);
        res.unwrap();
        assert_eq!(event.sql.text, "Sp_Prepare Sp_Unprepare ");
    }
}
