//! Capacity-capped text accumulation.

use core::fmt::{self, Write};

/// A rendered text field together with its truncation marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlText {
    /// The rendered text, valid UTF-8, at most the sink capacity.
    pub text: String,
    /// Whether any append overflowed the capacity.
    pub truncated: bool,
}

/// An append-only text buffer with a fixed byte capacity.
///
/// Renders SQL text, parameter lists, error messages and names while the
/// decoders walk the capture. An append that would exceed the capacity
/// keeps the fitting prefix (on a character boundary) and sets the sticky
/// `truncated` flag; appends never fail.
#[derive(Debug)]
pub struct StringSink {
    buf: String,
    cap: usize,
    truncated: bool,
}

impl StringSink {
    /// Create a sink holding at most `cap` bytes of UTF-8.
    #[must_use]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: String::new(),
            cap,
            truncated: false,
        }
    }

    /// Bytes currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Whether any append has overflowed the capacity.
    #[must_use]
    pub const fn truncated(&self) -> bool {
        self.truncated
    }

    /// The rendered text so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Append a string, keeping the fitting prefix on overflow.
    pub fn append_str(&mut self, s: &str) {
        let room = self.cap - self.buf.len();
        if s.len() <= room {
            self.buf.push_str(s);
            return;
        }
        self.truncated = true;
        let mut cut = room;
        while cut > 0 && !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.buf.push_str(&s[..cut]);
    }

    /// Append a single character.
    pub fn append_char(&mut self, c: char) {
        if c.len_utf8() > self.cap - self.buf.len() {
            self.truncated = true;
            return;
        }
        self.buf.push(c);
    }

    /// Append bytes as `0x`-prefixed lowercase hex.
    pub fn append_hex(&mut self, bytes: &[u8]) {
        self.append_str("0x");
        for b in bytes {
            let _ = write!(self, "{b:02x}");
        }
    }

    /// Append `s` with every occurrence of `quote` doubled.
    ///
    /// This is the SQL literal escape: `O'Brien` quoted with `'` becomes
    /// `O''Brien`. The surrounding quotes are the caller's business.
    pub fn append_quoted_escaped(&mut self, s: &str, quote: char) {
        for c in s.chars() {
            if c == quote {
                self.append_char(quote);
            }
            self.append_char(c);
        }
    }

    /// Append UCS-2 little-endian bytes decoded to UTF-8.
    ///
    /// A trailing odd byte and anything from the first invalid code unit
    /// onward are dropped silently; captures are full of both.
    pub fn append_ucs2(&mut self, bytes: &[u8]) {
        let units = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));
        for decoded in char::decode_utf16(units) {
            match decoded {
                Ok(c) => self.append_char(c),
                Err(_) => break,
            }
        }
    }

    /// Append single-byte text decoded as WINDOWS-1252.
    pub fn append_single_byte(&mut self, bytes: &[u8]) {
        let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
        self.append_str(&text);
    }

    /// Finish the sink into its rendered text and truncation marker.
    #[must_use]
    pub fn finish(self) -> SqlText {
        SqlText {
            text: self.buf,
            truncated: self.truncated,
        }
    }
}

impl Write for StringSink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append_str(s);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn append_within_capacity() {
        let mut sink = StringSink::with_capacity(16);
        sink.append_str("SELECT 1");
        assert_eq!(sink.as_str(), "SELECT 1");
        assert!(!sink.truncated());
    }

    #[test]
    fn overflow_keeps_prefix_and_flags() {
        let mut sink = StringSink::with_capacity(4);
        sink.append_str("SELECT");
        assert_eq!(sink.as_str(), "SELE");
        assert!(sink.truncated());
        // Sticky even if later appends would fit.
        sink.append_str("");
        assert!(sink.truncated());
    }

    #[test]
    fn overflow_respects_char_boundaries() {
        let mut sink = StringSink::with_capacity(3);
        sink.append_str("aé̈"); // 'a' + 2-byte 'é' + combining mark
        assert_eq!(sink.as_str(), "aé");
        assert!(sink.truncated());
    }

    #[test]
    fn ucs2_ascii_round_trips() {
        let mut sink = StringSink::with_capacity(32);
        sink.append_ucs2(&[0x53, 0x00, 0x51, 0x00, 0x4C, 0x00]);
        assert_eq!(sink.as_str(), "SQL");
    }

    #[test]
    fn ucs2_stops_at_invalid_unit() {
        // 'A', unpaired high surrogate, 'B': everything from the bad unit on is dropped.
        let mut sink = StringSink::with_capacity(32);
        sink.append_ucs2(&[0x41, 0x00, 0x00, 0xD8, 0x42, 0x00]);
        assert_eq!(sink.as_str(), "A");
    }

    #[test]
    fn ucs2_drops_trailing_odd_byte() {
        let mut sink = StringSink::with_capacity(32);
        sink.append_ucs2(&[0x41, 0x00, 0x42]);
        assert_eq!(sink.as_str(), "A");
    }

    #[test]
    fn hex_renders_prefixed_pairs() {
        let mut sink = StringSink::with_capacity(32);
        sink.append_hex(&[0xDE, 0xAD, 0x01]);
        assert_eq!(sink.as_str(), "0xdead01");
    }

    #[test]
    fn quote_escape_doubles_quotes() {
        let mut sink = StringSink::with_capacity(32);
        sink.append_quoted_escaped("it's", '\'');
        assert_eq!(sink.as_str(), "it''s");
    }

    #[test]
    fn single_byte_uses_windows_1252() {
        let mut sink = StringSink::with_capacity(32);
        sink.append_single_byte(&[0x63, 0x61, 0x66, 0xE9]); // "café" in 1252
        assert_eq!(sink.as_str(), "café");
    }

    #[test]
    fn finish_carries_truncation() {
        let mut sink = StringSink::with_capacity(2);
        sink.append_str("abc");
        let text = sink.finish();
        assert_eq!(text.text, "ab");
        assert!(text.truncated);
    }
}
