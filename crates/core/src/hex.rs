//! Stateless conversion between ASCII hex text and byte/word values.
//!
//! Parsing is deliberately permissive: malformed input never raises an
//! error, it just stops consuming. The console degrades gracefully on typos.

/// Sentinel returned by [`HexCursor::parse_word`] callers that need a
/// "no value here" marker. Chosen so that no 8-digit-or-fewer byte list
/// a user actually types collides with it in practice.
pub const UNSPEC: u32 = 0xFFFF_FFFF;

/// Maps '0'-'9', 'a'-'f', 'A'-'F' to 0..=15.
pub fn hex_digit_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Formats a byte as exactly two lowercase hex digits, no prefix.
pub fn format_byte(b: u8) -> String {
    format!("{b:02x}")
}

/// Forward-only cursor over a console argument string.
#[derive(Debug)]
pub struct HexCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> HexCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Skips leading whitespace, then consumes consecutive hex digits,
    /// accumulating `value * 16 + digit` with 32-bit wraparound: more than
    /// 8 digits silently keeps only the low 32 bits, last 8 digits win.
    /// If the first non-whitespace character is not a hex digit, returns
    /// `default` and leaves the cursor on that character.
    pub fn parse_word(&mut self, default: u32) -> u32 {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }

        let Some(first) = self.peek().and_then(hex_digit_value) else {
            return default;
        };

        let mut value = u32::from(first);
        self.pos += 1;
        while let Some(digit) = self.peek().and_then(hex_digit_value) {
            value = (value << 4) | u32::from(digit);
            self.pos += 1;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_values() {
        assert_eq!(hex_digit_value(b'0'), Some(0));
        assert_eq!(hex_digit_value(b'9'), Some(9));
        assert_eq!(hex_digit_value(b'a'), Some(10));
        assert_eq!(hex_digit_value(b'f'), Some(15));
        assert_eq!(hex_digit_value(b'A'), Some(10));
        assert_eq!(hex_digit_value(b'F'), Some(15));
        assert_eq!(hex_digit_value(b'g'), None);
        assert_eq!(hex_digit_value(b' '), None);
    }

    #[test]
    fn test_parse_simple_word() {
        let mut cur = HexCursor::new("1a");
        assert_eq!(cur.parse_word(UNSPEC), 26);
    }

    #[test]
    fn test_parse_skips_whitespace_and_stops_at_garbage() {
        let mut cur = HexCursor::new("  2f garbage");
        assert_eq!(cur.parse_word(UNSPEC), 47);
        // Cursor sits on the first non-hex character (the space before
        // "garbage"); the next parse returns the default without consuming
        // past the whitespace run into "garbage".
        assert_eq!(cur.pos(), 4);
        assert_eq!(cur.parse_word(UNSPEC), UNSPEC);
    }

    #[test]
    fn test_default_on_non_hex() {
        let mut cur = HexCursor::new("zz");
        assert_eq!(cur.parse_word(7), 7);
        assert_eq!(cur.pos(), 0);
    }

    #[test]
    fn test_truncation_keeps_last_eight_digits() {
        let mut long = HexCursor::new("123456789a");
        let mut short = HexCursor::new("3456789a");
        assert_eq!(long.parse_word(UNSPEC), short.parse_word(UNSPEC));
        assert_eq!(HexCursor::new("123456789a").parse_word(0), 0x3456_789a);
    }

    #[test]
    fn test_case_insensitive() {
        let mut upper = HexCursor::new("DEADBEEF");
        assert_eq!(upper.parse_word(UNSPEC), 0xDEAD_BEEF);
    }

    #[test]
    fn test_format_byte() {
        assert_eq!(format_byte(0x00), "00");
        assert_eq!(format_byte(0x0f), "0f");
        assert_eq!(format_byte(0xff), "ff");
        assert_eq!(format_byte(0x2a), "2a");
    }

    #[test]
    fn test_parse_format_round_trip() {
        for value in [0u32, 1, 0x1a, 0x2f, 0x7f, 0x80, 0xcd, 0xff, 0x1ff, 0xabcd] {
            let text = format!("{value:x}");
            let mut cur = HexCursor::new(&text);
            let parsed = cur.parse_word(UNSPEC);
            assert_eq!(parsed, value);
            assert_eq!(format_byte(parsed as u8), format!("{:02x}", value % 256));
        }
    }
}
