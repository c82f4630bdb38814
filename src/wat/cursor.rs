//! Character-level cursor for navigating WAST source text.
//!
//! The cursor provides low-level character iteration while tracking position
//! information (byte offset, line, column) so scanned forms can be reported
//! against the line they start on.

/// A saved position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Byte offset from start of source.
    pub offset: usize,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, counts characters).
    pub column: u32,
}

/// A cursor for navigating through source text character by character.
///
/// Tracks byte position, line number, and column number. Columns count
/// Unicode characters (not bytes).
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    /// The complete source text.
    source: &'a str,
    /// Remaining source text (slice starting at current position).
    remaining: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    /// Create a new cursor at the start of the source text.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            remaining: source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Create a cursor positioned at `offset`, with line and column computed
    /// from the text before it.
    ///
    /// Offsets past the end (or inside a multi-byte character) clamp to the
    /// nearest preceding character boundary.
    pub fn at(source: &'a str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line = before.matches('\n').count() as u32 + 1;
        let column = match before.rfind('\n') {
            Some(nl) => before[nl + 1..].chars().count() as u32 + 1,
            None => before.chars().count() as u32 + 1,
        };
        Self {
            source,
            remaining: &source[offset..],
            offset,
            line,
            column,
        }
    }

    /// Get the current position.
    pub fn position(&self) -> Position {
        Position {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    /// Current byte offset in the source.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether we've reached the end of input.
    pub fn is_eof(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Peek at the next character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    /// Peek at the character after the next one.
    pub fn peek_second(&self) -> Option<char> {
        let mut chars = self.remaining.chars();
        chars.next();
        chars.next()
    }

    /// Consume and return the next character.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.remaining.chars().next()?;
        let char_len = c.len_utf8();

        self.remaining = &self.remaining[char_len..];
        self.offset += char_len;

        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(c)
    }

    /// Consume two characters (a two-character marker such as `(;` or `;;`).
    pub fn advance_pair(&mut self) {
        self.advance();
        self.advance();
    }

    /// Consume characters while the predicate returns true.
    ///
    /// Returns the number of characters consumed.
    pub fn skip_while(&mut self, predicate: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.advance();
            count += 1;
        }
        count
    }

    /// Consume characters while the predicate holds and return them as a slice.
    pub fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let start = self.offset;
        self.skip_while(predicate);
        &self.source[start..self.offset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cursor_starts_at_beginning() {
        let cursor = Cursor::new("hello");
        let pos = cursor.position();
        assert_eq!(pos.offset, 0);
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 1);
        assert!(!cursor.is_eof());
    }

    #[test]
    fn empty_source() {
        let cursor = Cursor::new("");
        assert!(cursor.is_eof());
        assert_eq!(cursor.peek(), None);
    }

    #[test]
    fn peek_second() {
        let cursor = Cursor::new("abc");
        assert_eq!(cursor.peek(), Some('a'));
        assert_eq!(cursor.peek_second(), Some('b'));
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn newlines_update_line_and_column() {
        let mut cursor = Cursor::new("a\nb\nc");

        cursor.advance(); // 'a'
        assert_eq!(cursor.position().column, 2);

        cursor.advance(); // '\n'
        assert_eq!(cursor.position().line, 2);
        assert_eq!(cursor.position().column, 1);

        cursor.advance_pair(); // 'b', '\n'
        assert_eq!(cursor.position().line, 3);
        assert_eq!(cursor.position().column, 1);
    }

    #[test]
    fn unicode_characters() {
        let mut cursor = Cursor::new("a\u{1F600}b");

        cursor.advance();
        assert_eq!(cursor.advance(), Some('\u{1F600}'));
        assert_eq!(cursor.position().offset, 5); // emoji is 4 bytes
        assert_eq!(cursor.position().column, 3); // but 1 character
    }

    #[test]
    fn at_computes_line_and_column() {
        let source = "(a)\n  (b)\n(c)";
        let cursor = Cursor::at(source, 6);
        assert_eq!(cursor.peek(), Some('b'));
        assert_eq!(cursor.position().line, 2);
        assert_eq!(cursor.position().column, 4);
    }

    #[test]
    fn at_clamps_out_of_range_offsets() {
        let cursor = Cursor::at("ab", 10);
        assert!(cursor.is_eof());
        assert_eq!(cursor.offset(), 2);

        // Offset 2 is inside the two-byte 'é'.
        let cursor = Cursor::at("aé", 2);
        assert_eq!(cursor.offset(), 1);
    }

    #[test]
    fn take_while_stops_at_predicate() {
        let mut cursor = Cursor::new("hello world");
        assert_eq!(cursor.take_while(|c| c != ' '), "hello");
        assert_eq!(cursor.offset(), 5);
        assert_eq!(cursor.peek(), Some(' '));
    }
}
