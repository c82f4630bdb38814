//! Boundary scanner for WAST scripts.
//!
//! The scanner finds parenthesised forms without tokenising their contents.
//! It understands exactly enough of the text format to stay in sync: `;;` line
//! comments, nestable `(; ... ;)` block comments, and string literals with
//! backslash escapes. Parentheses inside any of those are never structural.
//!
//! A single scan state and one step function drive every use: iterating
//! top-level forms, extracting the form that starts at a known offset, and
//! searching a form for a nested form with a given head symbol.
//!
//! Scanning is lenient. An unterminated string, block comment or form consumes
//! the rest of the input and yields nothing; [`Forms::leftover`] reports what
//! was left open once iteration is over.
//!
//! # Example
//!
//! ```
//! use cwast::wat::scanner::forms;
//!
//! let source = r#"
//!     ;; a comment with a stray )
//!     (component $c)
//!     (assert_invalid (component (; ) ;)) "msg )")
//! "#;
//! let heads: Vec<_> = forms(source).map(|f| f.head().unwrap()).collect();
//! assert_eq!(heads, ["component", "assert_invalid"]);
//! ```

use super::cursor::{Cursor, Position};
use std::fmt;
use std::iter::FusedIterator;

/// A complete top-level form: `(` ... matching `)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Form<'a> {
    /// The form text, including both parentheses.
    pub text: &'a str,
    /// Byte offset of the opening parenthesis in the scanned source.
    pub offset: usize,
    /// Line of the opening parenthesis (1-indexed).
    pub line: u32,
}

impl<'a> Form<'a> {
    /// The head symbol of the form, e.g. `component` or `assert_return`.
    pub fn head(&self) -> Option<&'a str> {
        first_symbol(self.text)
    }

    /// Byte offset just past the closing parenthesis.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// What was still open when the input ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeftoverKind {
    String,
    BlockComment,
    Form,
}

/// An unterminated construct at the end of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leftover {
    pub kind: LeftoverKind,
    /// Line where the unterminated construct starts.
    pub line: u32,
}

impl fmt::Display for Leftover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            LeftoverKind::String => "string literal",
            LeftoverKind::BlockComment => "block comment",
            LeftoverKind::Form => "form",
        };
        write!(f, "unterminated {} starting at line {}", what, self.line)
    }
}

/// Lexical state threaded through the scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ScanState {
    /// Structural parenthesis depth. Never negative: a `)` at depth zero is
    /// ignored.
    depth: usize,
    /// Block comment nesting depth.
    block_depth: usize,
    in_string: bool,
    /// The previous string character was a backslash.
    escape: bool,
    /// Where the current string or outermost block comment started.
    opened_at: Option<Position>,
}

/// A structural parenthesis found by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Open(Position),
    Close(Position),
}

/// Drives a [`Cursor`] through the text, yielding structural parentheses.
#[derive(Debug, Clone)]
struct Walker<'a> {
    cursor: Cursor<'a>,
    state: ScanState,
}

impl<'a> Walker<'a> {
    fn new(cursor: Cursor<'a>) -> Self {
        Self {
            cursor,
            state: ScanState::default(),
        }
    }

    /// Advance to the next structural parenthesis, updating the depth.
    fn next_event(&mut self) -> Option<Event> {
        loop {
            let c = self.cursor.peek()?;
            let state = &mut self.state;

            if state.block_depth > 0 {
                match (c, self.cursor.peek_second()) {
                    ('(', Some(';')) => {
                        state.block_depth += 1;
                        self.cursor.advance_pair();
                    }
                    (';', Some(')')) => {
                        state.block_depth -= 1;
                        if state.block_depth == 0 {
                            state.opened_at = None;
                        }
                        self.cursor.advance_pair();
                    }
                    _ => {
                        self.cursor.advance();
                    }
                }
                continue;
            }

            if state.in_string {
                self.cursor.advance();
                if state.escape {
                    state.escape = false;
                } else if c == '\\' {
                    state.escape = true;
                } else if c == '"' {
                    state.in_string = false;
                    state.opened_at = None;
                }
                continue;
            }

            match (c, self.cursor.peek_second()) {
                (';', Some(';')) => {
                    self.cursor.skip_while(|c| c != '\n');
                }
                ('(', Some(';')) => {
                    state.block_depth = 1;
                    state.opened_at = Some(self.cursor.position());
                    self.cursor.advance_pair();
                }
                ('"', _) => {
                    state.in_string = true;
                    state.opened_at = Some(self.cursor.position());
                    self.cursor.advance();
                }
                ('(', _) => {
                    let pos = self.cursor.position();
                    self.cursor.advance();
                    state.depth += 1;
                    return Some(Event::Open(pos));
                }
                (')', _) => {
                    let pos = self.cursor.position();
                    self.cursor.advance();
                    if state.depth == 0 {
                        continue;
                    }
                    state.depth -= 1;
                    return Some(Event::Close(pos));
                }
                _ => {
                    self.cursor.advance();
                }
            }
        }
    }
}

/// Lazy iterator over the top-level forms of a source text.
///
/// Created by [`forms`]. The iterator is not restartable; scan again from the
/// source to make a second pass.
#[derive(Debug, Clone)]
pub struct Forms<'a> {
    source: &'a str,
    walker: Walker<'a>,
    start: Option<Position>,
}

/// Iterate the top-level forms of `source`.
pub fn forms(source: &str) -> Forms<'_> {
    Forms {
        source,
        walker: Walker::new(Cursor::new(source)),
        start: None,
    }
}

impl<'a> Forms<'a> {
    /// Once iteration has finished, reports anything left unterminated.
    ///
    /// Returns `None` while input remains or when the text ended cleanly.
    pub fn leftover(&self) -> Option<Leftover> {
        if !self.walker.cursor.is_eof() {
            return None;
        }
        let state = &self.walker.state;
        let opened_line = state.opened_at.map(|p| p.line);
        if state.in_string {
            return opened_line.map(|line| Leftover {
                kind: LeftoverKind::String,
                line,
            });
        }
        if state.block_depth > 0 {
            return opened_line.map(|line| Leftover {
                kind: LeftoverKind::BlockComment,
                line,
            });
        }
        if state.depth > 0 {
            return self.start.map(|p| Leftover {
                kind: LeftoverKind::Form,
                line: p.line,
            });
        }
        None
    }
}

impl<'a> Iterator for Forms<'a> {
    type Item = Form<'a>;

    fn next(&mut self) -> Option<Form<'a>> {
        while let Some(event) = self.walker.next_event() {
            match event {
                Event::Open(pos) if self.walker.state.depth == 1 => {
                    self.start = Some(pos);
                }
                Event::Close(pos) if self.walker.state.depth == 0 => {
                    let Some(start) = self.start.take() else {
                        continue;
                    };
                    return Some(Form {
                        text: &self.source[start.offset..=pos.offset],
                        offset: start.offset,
                        line: start.line,
                    });
                }
                _ => {}
            }
        }
        None
    }
}

impl FusedIterator for Forms<'_> {}

/// Extract the complete form whose opening parenthesis is at or after `start`.
///
/// Returns `None` if no form begins there or it is never closed.
pub fn extract_form(text: &str, start: usize) -> Option<&str> {
    let mut walker = Walker::new(Cursor::at(text, start));
    let mut open = None;
    while let Some(event) = walker.next_event() {
        match event {
            Event::Open(pos) if open.is_none() => open = Some(pos.offset),
            Event::Close(pos) if walker.state.depth == 0 => {
                return open.map(|begin| &text[begin..=pos.offset]);
            }
            _ => {}
        }
    }
    None
}

/// Find the first form nested inside `form` whose head symbol is `head`.
///
/// The outermost form itself is not a candidate. Forms inside comments and
/// string literals are never matched.
pub fn find_nested_form<'a>(form: &'a str, head: &str) -> Option<&'a str> {
    let mut walker = Walker::new(Cursor::new(form));
    let mut seen_outer = false;
    while let Some(event) = walker.next_event() {
        if let Event::Open(pos) = event {
            if !seen_outer {
                seen_outer = true;
                continue;
            }
            // The walker sits just past the `(`; read the head from a copy.
            let mut lookahead = walker.cursor.clone();
            if take_symbol(&mut lookahead) == Some(head) {
                return extract_form(form, pos.offset);
            }
        }
    }
    None
}

/// Skip whitespace, line comments and block comments at the cursor.
///
/// An unterminated block comment consumes the rest of the input.
pub(crate) fn skip_trivia(cursor: &mut Cursor<'_>) {
    loop {
        cursor.skip_while(|c| c.is_whitespace());
        match (cursor.peek(), cursor.peek_second()) {
            (Some(';'), Some(';')) => {
                cursor.skip_while(|c| c != '\n');
            }
            (Some('('), Some(';')) => {
                cursor.advance_pair();
                let mut depth = 1;
                while depth > 0 && !cursor.is_eof() {
                    match (cursor.peek(), cursor.peek_second()) {
                        (Some('('), Some(';')) => {
                            depth += 1;
                            cursor.advance_pair();
                        }
                        (Some(';'), Some(')')) => {
                            depth -= 1;
                            cursor.advance_pair();
                        }
                        _ => {
                            cursor.advance();
                        }
                    }
                }
            }
            _ => return,
        }
    }
}

/// Whether `c` terminates a bare symbol.
pub(crate) fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')'
}

/// Read the next bare symbol at or after `offset`, skipping whitespace and
/// comments.
///
/// Returns the symbol and the byte offset just past it, or `None` when the
/// next character is a parenthesis or the input is exhausted.
pub fn read_symbol(text: &str, offset: usize) -> Option<(&str, usize)> {
    let mut cursor = Cursor::at(text, offset);
    take_symbol(&mut cursor).map(|symbol| (symbol, cursor.offset()))
}

/// Skip trivia and consume the bare symbol at the cursor, if any.
fn take_symbol<'a>(cursor: &mut Cursor<'a>) -> Option<&'a str> {
    skip_trivia(cursor);
    let symbol = cursor.take_while(|c| !is_delimiter(c));
    (!symbol.is_empty()).then_some(symbol)
}

/// The head symbol of a form: the first symbol after its opening parenthesis.
pub fn first_symbol(form: &str) -> Option<&str> {
    let open = form.find('(')?;
    read_symbol(form, open + 1).map(|(sym, _)| sym)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<&str> {
        forms(source).map(|f| f.text).collect()
    }

    // ------------------------------------------------------------------------
    // Top-level forms
    // ------------------------------------------------------------------------

    #[test]
    fn empty_and_comment_only_sources_have_no_forms() {
        assert!(texts("").is_empty());
        assert!(texts("  \n\t ").is_empty());
        assert!(texts(";; just a comment\n(; and (a) block ;)").is_empty());
    }

    #[test]
    fn one_form_per_top_level_expression() {
        let source = "(component $a)\n(component $b (core module))\n(invoke \"f\")";
        assert_eq!(
            texts(source),
            ["(component $a)", "(component $b (core module))", "(invoke \"f\")"]
        );
    }

    #[test]
    fn parens_in_strings_are_not_structural() {
        let source = r#"(assert_invalid (component) "bad ) token (") (invoke "f")"#;
        assert_eq!(
            texts(source),
            [r#"(assert_invalid (component) "bad ) token (")"#, r#"(invoke "f")"#]
        );
    }

    #[test]
    fn escaped_quotes_do_not_end_strings() {
        let source = r#"(a "x\")y") (b)"#;
        assert_eq!(texts(source), [r#"(a "x\")y")"#, "(b)"]);
    }

    #[test]
    fn escaped_backslash_ends_escape() {
        let source = r#"(a "x\\") (b)"#;
        assert_eq!(texts(source), [r#"(a "x\\")"#, "(b)"]);
    }

    #[test]
    fn comments_inside_forms_are_skipped() {
        let source = "(a ;; ) not a close\n (; ) ;) b)\n(c)";
        let found = texts(source);
        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("b)"));
        assert_eq!(found[1], "(c)");
    }

    #[test]
    fn nested_block_comments() {
        let source = "(; outer (; inner ;) (still comment) ;) (a)";
        assert_eq!(texts(source), ["(a)"]);
    }

    #[test]
    fn comment_markers_inside_strings_are_ignored() {
        let source = r#"(a ";; (; not comments") (b)"#;
        assert_eq!(texts(source), [r#"(a ";; (; not comments")"#, "(b)"]);
    }

    #[test]
    fn stray_close_paren_is_ignored() {
        let source = ") (a) ) (b)";
        assert_eq!(texts(source), ["(a)", "(b)"]);
    }

    #[test]
    fn forms_report_offset_and_line() {
        let source = "(a)\n\n  (b\n c)";
        let all: Vec<_> = forms(source).collect();
        assert_eq!(all[0].offset, 0);
        assert_eq!(all[0].line, 1);
        assert_eq!(all[1].offset, 7);
        assert_eq!(all[1].line, 3);
        assert_eq!(all[1].end(), source.len());
    }

    #[test]
    fn forms_and_separators_reproduce_source() {
        let source = ";; header\n(component $a (; c ;) )\n  (invoke \"f\" (u32.const 1)) ;; tail\n";
        let mut rebuilt = String::new();
        let mut last = 0;
        for form in forms(source) {
            rebuilt.push_str(&source[last..form.offset]);
            rebuilt.push_str(form.text);
            last = form.end();
        }
        rebuilt.push_str(&source[last..]);
        assert_eq!(rebuilt, source);
    }

    // ------------------------------------------------------------------------
    // Leniency
    // ------------------------------------------------------------------------

    #[test]
    fn unterminated_string_consumes_rest() {
        let mut iter = forms("(a) (b \"open ) (c)");
        assert_eq!(iter.next().map(|f| f.text), Some("(a)"));
        assert_eq!(iter.next(), None);
        assert_eq!(
            iter.leftover(),
            Some(Leftover {
                kind: LeftoverKind::String,
                line: 1
            })
        );
    }

    #[test]
    fn unterminated_block_comment_consumes_rest() {
        let mut iter = forms("(a)\n(; open (b)");
        assert_eq!(iter.by_ref().count(), 1);
        assert_eq!(
            iter.leftover(),
            Some(Leftover {
                kind: LeftoverKind::BlockComment,
                line: 2
            })
        );
    }

    #[test]
    fn unterminated_form_yields_nothing() {
        let mut iter = forms("(a)\n\n(b (c)");
        assert_eq!(iter.by_ref().count(), 1);
        let leftover = iter.leftover().unwrap();
        assert_eq!(leftover.kind, LeftoverKind::Form);
        assert_eq!(leftover.line, 3);
        assert_eq!(leftover.to_string(), "unterminated form starting at line 3");
    }

    #[test]
    fn clean_input_has_no_leftover() {
        let mut iter = forms("(a) (b)");
        assert_eq!(iter.by_ref().count(), 2);
        assert_eq!(iter.leftover(), None);
        assert_eq!(iter.next(), None);
    }

    // ------------------------------------------------------------------------
    // Extraction and nested search
    // ------------------------------------------------------------------------

    #[test]
    fn extract_form_from_offset() {
        let text = "(outer (inner \")\" (x)) tail)";
        assert_eq!(extract_form(text, 7), Some("(inner \")\" (x))"));
        assert_eq!(extract_form(text, 0), Some(text));
        assert_eq!(extract_form("(open", 0), None);
    }

    #[test]
    fn find_nested_component() {
        let form = r#"(assert_invalid (component (core module $m)) "type mismatch")"#;
        assert_eq!(
            find_nested_form(form, "component"),
            Some("(component (core module $m))")
        );
    }

    #[test]
    fn find_nested_skips_outer_form() {
        let form = "(component (component $inner))";
        assert_eq!(find_nested_form(form, "component"), Some("(component $inner)"));
    }

    #[test]
    fn find_nested_ignores_comments_and_strings() {
        let form = r#"(assert_malformed ;; (component bogus)
            "(component fake)" (; (component hidden) ;) (component $real))"#;
        assert_eq!(find_nested_form(form, "component"), Some("(component $real)"));
        assert_eq!(find_nested_form("(assert_trap (invoke \"f\") \"x\")", "component"), None);
    }

    #[test]
    fn find_nested_sees_head_after_comment() {
        let form = "(assert_invalid ( (; c ;) component $x))";
        assert_eq!(find_nested_form(form, "component"), Some("( (; c ;) component $x)"));
    }

    #[test]
    fn find_nested_in_large_multiline_form() {
        let mut form = String::from("(assert_return (invoke \"f\")\n");
        for _ in 0..20_000 {
            form.push_str("  (list.const (u8.const 1))\n");
        }
        assert_eq!(find_nested_form(&form, "component"), None);

        form.push_str("  (component $last))");
        assert_eq!(find_nested_form(&form, "component"), Some("(component $last)"));
    }

    // ------------------------------------------------------------------------
    // Symbols
    // ------------------------------------------------------------------------

    #[test]
    fn read_symbols_in_sequence() {
        let form = "(component definition $c (core module))";
        let (first, i) = read_symbol(form, 1).unwrap();
        assert_eq!(first, "component");
        let (second, j) = read_symbol(form, i).unwrap();
        assert_eq!(second, "definition");
        let (third, k) = read_symbol(form, j).unwrap();
        assert_eq!(third, "$c");
        assert_eq!(read_symbol(form, k), None);
    }

    #[test]
    fn first_symbol_skips_comments() {
        assert_eq!(first_symbol("( ;; c\n (; b ;) assert_return)"), Some("assert_return"));
        assert_eq!(first_symbol("()"), None);
        assert_eq!(first_symbol("no parens"), None);
    }
}
