//! S-expression reader for individual WAST forms.
//!
//! Forms handed over by the [scanner](super::scanner) are read into an
//! [`SNode`] tree. Only three shapes exist: bare atoms, string literals, and
//! parenthesised lists. Nothing is interpreted beyond that; classification
//! happens in [`crate::wast`].
//!
//! String literals are decoded while reading and stored as raw bytes, so that
//! `(module binary "\00asm...")` payloads survive byte for byte. Escape
//! handling is lenient: an unknown escape yields the escaped character itself.
//!
//! # Example
//!
//! ```
//! use cwast::wat::sexpr::{read, SNode};
//!
//! let node = read(r#"(invoke $c "add" (u32.const 1))"#).unwrap();
//! let list = node.as_list().unwrap();
//! assert_eq!(list.head_atom(), Some("invoke"));
//! assert_eq!(list.get(2).and_then(SNode::as_str), Some(&b"add"[..]));
//! ```

use super::cursor::{Cursor, Position};
use super::scanner::{is_delimiter, skip_trivia};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Type
// ============================================================================

/// An error encountered while reading a form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ReadError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl ReadError {
    fn new(message: impl Into<String>, pos: Position) -> Self {
        Self {
            message: message.into(),
            line: pos.line,
            column: pos.column,
        }
    }
}

// ============================================================================
// Node Types
// ============================================================================

/// A node of a parsed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SNode {
    /// A bare symbol: keyword, `$name`, number, `u32.const`, ...
    Atom(String),
    /// A string literal with escapes resolved, as raw bytes.
    Str(Vec<u8>),
    /// A parenthesised list.
    List(Vec<SNode>),
}

impl SNode {
    /// Returns the atom text if this is an atom.
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SNode::Atom(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the decoded bytes if this is a string literal.
    pub fn as_str(&self) -> Option<&[u8]> {
        match self {
            SNode::Str(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the string literal as UTF-8 text, if it is one and decodes.
    pub fn as_text(&self) -> Option<&str> {
        self.as_str().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Returns a list view if this is a list.
    pub fn as_list(&self) -> Option<NodeList<'_>> {
        match self {
            SNode::List(items) => Some(NodeList { items }),
            _ => None,
        }
    }

    /// Returns true if this is a list whose head is the given atom.
    pub fn is_list_headed_by(&self, head: &str) -> bool {
        self.as_list().is_some_and(|list| list.head_atom() == Some(head))
    }
}

// ============================================================================
// List View
// ============================================================================

/// A borrowed view of a list node with positional accessors.
#[derive(Debug, Clone, Copy)]
pub struct NodeList<'a> {
    pub items: &'a [SNode],
}

impl<'a> NodeList<'a> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the item at the given index.
    pub fn get(&self, index: usize) -> Option<&'a SNode> {
        self.items.get(index)
    }

    /// Returns the head atom, the usual `(keyword ...)` pattern.
    pub fn head_atom(&self) -> Option<&'a str> {
        self.items.first().and_then(SNode::as_atom)
    }

    /// Returns the atom at `index`, if that item is an atom.
    pub fn atom(&self, index: usize) -> Option<&'a str> {
        self.get(index).and_then(SNode::as_atom)
    }

    /// Iterates over items starting from the given index.
    pub fn iter_from(&self, start: usize) -> impl Iterator<Item = &'a SNode> {
        self.items.iter().skip(start)
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Read a single S-expression from `source`.
///
/// Leading and trailing whitespace and comments are allowed; anything else
/// after the expression is an error.
pub fn read(source: &str) -> Result<SNode, ReadError> {
    let mut cursor = Cursor::new(source);
    let node = read_node(&mut cursor)?;
    skip_trivia(&mut cursor);
    if !cursor.is_eof() {
        return Err(ReadError::new("unexpected text after expression", cursor.position()));
    }
    Ok(node)
}

fn read_node(cursor: &mut Cursor<'_>) -> Result<SNode, ReadError> {
    skip_trivia(cursor);
    let start = cursor.position();
    match cursor.peek() {
        None => Err(ReadError::new("unexpected end of input", start)),
        Some('(') => {
            cursor.advance();
            let mut items = Vec::new();
            loop {
                skip_trivia(cursor);
                match cursor.peek() {
                    None => return Err(ReadError::new("unclosed parenthesis", start)),
                    Some(')') => {
                        cursor.advance();
                        return Ok(SNode::List(items));
                    }
                    Some(_) => items.push(read_node(cursor)?),
                }
            }
        }
        Some(')') => Err(ReadError::new("unexpected ')'", start)),
        Some('"') => read_string(cursor).map(SNode::Str),
        Some(_) => {
            let text = cursor.take_while(|c| !is_delimiter(c));
            Ok(SNode::Atom(text.to_string()))
        }
    }
}

/// Read a string literal (cursor on the opening quote), decoding escapes.
fn read_string(cursor: &mut Cursor<'_>) -> Result<Vec<u8>, ReadError> {
    let start = cursor.position();
    cursor.advance();

    let mut bytes = Vec::new();
    loop {
        match cursor.advance() {
            None => return Err(ReadError::new("unterminated string literal", start)),
            Some('"') => return Ok(bytes),
            Some('\\') => match cursor.advance() {
                None => return Err(ReadError::new("unterminated string literal", start)),
                Some(esc) => decode_escape(cursor, esc, &mut bytes),
            },
            Some(c) => push_char(&mut bytes, c),
        }
    }
}

/// Decode the escape sequence whose first character (after `\`) is `esc`.
fn decode_escape(cursor: &mut Cursor<'_>, esc: char, bytes: &mut Vec<u8>) {
    if let (Some(high), Some(low)) = (esc.to_digit(16), cursor.peek().and_then(|c| c.to_digit(16))) {
        cursor.advance();
        bytes.push(((high << 4) | low) as u8);
        return;
    }
    match esc {
        'n' => bytes.push(b'\n'),
        't' => bytes.push(b'\t'),
        'r' => bytes.push(b'\r'),
        'u' => match read_unicode_escape(cursor) {
            Some(c) => push_char(bytes, c),
            None => bytes.push(b'u'),
        },
        other => push_char(bytes, other),
    }
}

/// Decode `{HEX}` after `\u`. On any malformation the cursor is left untouched.
fn read_unicode_escape(cursor: &mut Cursor<'_>) -> Option<char> {
    if cursor.peek() != Some('{') {
        return None;
    }
    let mut lookahead = cursor.clone();
    lookahead.advance();
    let digits = lookahead.take_while(|c| c != '}');
    if lookahead.advance() != Some('}') {
        return None;
    }
    let c = u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)?;
    *cursor = lookahead;
    Some(c)
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for SNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SNode::Atom(text) => write!(f, "{}", text),
            SNode::Str(bytes) => {
                write!(f, "\"")?;
                for &b in bytes {
                    if (b.is_ascii_graphic() && b != b'"' && b != b'\\') || b == b' ' {
                        write!(f, "{}", b as char)?;
                    } else {
                        write!(f, "\\{:02x}", b)?;
                    }
                }
                write!(f, "\"")
            }
            SNode::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
