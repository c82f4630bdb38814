//! Typed constants and invoke actions.
//!
//! Component-model scripts pass arguments and expected results as
//! `(<type>.const <operand>)` forms, with `list.const` nesting other
//! constants. Decoding checks each operand against its type (range, shape,
//! UTF-8) so that a bad literal is reported against the command that holds it
//! rather than surfacing later inside the runtime.
//!
//! Values are handed to the runtime as JSON objects of the form
//! `{"type": "u32", "value": "5"}` or `{"type": "list", "items": [...]}`.

use super::command::Invoke;
use super::name::ComponentName;
use crate::wat::SNode;
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

/// A typed constant from a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstValue {
    Bool(bool),
    U8(u8),
    S8(i8),
    U16(u16),
    S16(i16),
    U32(u32),
    S32(i32),
    U64(u64),
    S64(i64),
    Char(char),
    Str(String),
    String(String),
    List(Vec<ConstValue>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstError {
    #[error("expected a `<type>.const` form, found {0}")]
    NotAConst(String),
    #[error("unsupported value type `{0}`")]
    UnsupportedType(String),
    #[error("`{0}.const` is missing its operand")]
    MissingOperand(&'static str),
    #[error("invalid `{kind}.const` operand {text}")]
    InvalidOperand { kind: &'static str, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    #[error("expected an `invoke` form, found {0}")]
    NotAnInvoke(String),
    #[error("invoke is missing its field name string")]
    MissingField,
    #[error("invoke field name is not valid UTF-8")]
    FieldEncoding,
    #[error(transparent)]
    Argument(#[from] ConstError),
}

impl ConstValue {
    /// The type name used both in scripts (`<name>.const`) and in the runtime
    /// protocol.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConstValue::Bool(_) => "bool",
            ConstValue::U8(_) => "u8",
            ConstValue::S8(_) => "s8",
            ConstValue::U16(_) => "u16",
            ConstValue::S16(_) => "s16",
            ConstValue::U32(_) => "u32",
            ConstValue::S32(_) => "s32",
            ConstValue::U64(_) => "u64",
            ConstValue::S64(_) => "s64",
            ConstValue::Char(_) => "char",
            ConstValue::Str(_) => "str",
            ConstValue::String(_) => "string",
            ConstValue::List(_) => "list",
        }
    }

    /// Scalar payload rendered as text; `None` for lists.
    pub fn value_text(&self) -> Option<String> {
        Some(match self {
            ConstValue::Bool(v) => v.to_string(),
            ConstValue::U8(v) => v.to_string(),
            ConstValue::S8(v) => v.to_string(),
            ConstValue::U16(v) => v.to_string(),
            ConstValue::S16(v) => v.to_string(),
            ConstValue::U32(v) => v.to_string(),
            ConstValue::S32(v) => v.to_string(),
            ConstValue::U64(v) => v.to_string(),
            ConstValue::S64(v) => v.to_string(),
            ConstValue::Char(c) => c.to_string(),
            ConstValue::Str(s) | ConstValue::String(s) => s.clone(),
            ConstValue::List(_) => return None,
        })
    }
}

impl Serialize for ConstValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", self.type_name())?;
        match self {
            ConstValue::List(items) => map.serialize_entry("items", items)?,
            scalar => map.serialize_entry("value", &scalar.value_text())?,
        }
        map.end()
    }
}

/// Decode a `(<type>.const ...)` form.
pub fn decode_const(node: &SNode) -> Result<ConstValue, ConstError> {
    let not_const = || ConstError::NotAConst(node.to_string());
    let list = node.as_list().ok_or_else(not_const)?;
    let kind = list
        .head_atom()
        .and_then(|head| head.strip_suffix(".const"))
        .ok_or_else(not_const)?;

    if kind == "list" {
        let items = list.iter_from(1).map(decode_const).collect::<Result<_, _>>()?;
        return Ok(ConstValue::List(items));
    }

    let operand = list.get(1);
    Ok(match kind {
        "bool" => ConstValue::Bool(bool_operand(operand)?),
        "u8" => ConstValue::U8(int_operand(operand, "u8")?),
        "s8" => ConstValue::S8(signed_operand(operand, "s8", |v: u8| v as i8)?),
        "u16" => ConstValue::U16(int_operand(operand, "u16")?),
        "s16" => ConstValue::S16(signed_operand(operand, "s16", |v: u16| v as i16)?),
        "u32" => ConstValue::U32(int_operand(operand, "u32")?),
        "s32" => ConstValue::S32(signed_operand(operand, "s32", |v: u32| v as i32)?),
        "u64" => ConstValue::U64(int_operand(operand, "u64")?),
        "s64" => ConstValue::S64(signed_operand(operand, "s64", |v: u64| v as i64)?),
        "char" => {
            let text = text_operand(operand, "char")?;
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => ConstValue::Char(c),
                _ => return Err(invalid("char", operand)),
            }
        }
        "str" => ConstValue::Str(text_operand(operand, "str")?.to_string()),
        "string" => ConstValue::String(text_operand(operand, "string")?.to_string()),
        other => return Err(ConstError::UnsupportedType(other.to_string())),
    })
}

/// Decode `(invoke $instance? "field" args...)`.
pub fn decode_invoke(node: &SNode) -> Result<Invoke, InvokeError> {
    let list = node
        .as_list()
        .filter(|l| l.head_atom() == Some("invoke"))
        .ok_or_else(|| InvokeError::NotAnInvoke(node.to_string()))?;

    let mut idx = 1;
    let instance = list.atom(idx).and_then(ComponentName::from_atom);
    if instance.is_some() {
        idx += 1;
    }

    let field = list.get(idx).and_then(SNode::as_str).ok_or(InvokeError::MissingField)?;
    let field = String::from_utf8(field.to_vec()).map_err(|_| InvokeError::FieldEncoding)?;
    idx += 1;

    let args = list.iter_from(idx).map(decode_const).collect::<Result<_, _>>()?;
    Ok(Invoke { instance, field, args })
}

fn invalid(kind: &'static str, operand: Option<&SNode>) -> ConstError {
    ConstError::InvalidOperand {
        kind,
        text: operand.map(ToString::to_string).unwrap_or_default(),
    }
}

fn bool_operand(operand: Option<&SNode>) -> Result<bool, ConstError> {
    match operand.ok_or(ConstError::MissingOperand("bool"))?.as_atom() {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        _ => Err(invalid("bool", operand)),
    }
}

fn text_operand<'a>(operand: Option<&'a SNode>, kind: &'static str) -> Result<&'a str, ConstError> {
    operand
        .ok_or(ConstError::MissingOperand(kind))?
        .as_text()
        .ok_or_else(|| invalid(kind, operand))
}

fn int_operand<T: TryFrom<i128>>(operand: Option<&SNode>, kind: &'static str) -> Result<T, ConstError> {
    let atom = operand.ok_or(ConstError::MissingOperand(kind))?.as_atom();
    atom.and_then(parse_integer)
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| invalid(kind, operand))
}

/// Signed kinds also take the unsigned range of the same width, read as
/// two's complement: `(s8.const 0xff)` is `-1`.
fn signed_operand<S, U>(operand: Option<&SNode>, kind: &'static str, wrap: impl Fn(U) -> S) -> Result<S, ConstError>
where
    S: TryFrom<i128>,
    U: TryFrom<i128>,
{
    let atom = operand.ok_or(ConstError::MissingOperand(kind))?.as_atom();
    atom.and_then(parse_integer)
        .and_then(|v| S::try_from(v).ok().or_else(|| U::try_from(v).ok().map(wrap)))
        .ok_or_else(|| invalid(kind, operand))
}

/// Parse an integer literal: optional sign, decimal or `0x` hex digits, with
/// single `_` separators between digits.
fn parse_integer(text: &str) -> Option<i128> {
    let (negative, unsigned) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (radix, digits) = match unsigned.strip_prefix("0x").or_else(|| unsigned.strip_prefix("0X")) {
        Some(hex) => (16, hex),
        None => (10, unsigned),
    };
    let valid_digit = |c: char| c.is_digit(radix);
    if !digits.starts_with(valid_digit) || !digits.ends_with(valid_digit) || digits.contains("__") {
        return None;
    }
    let clean: String = digits.chars().filter(|&c| c != '_').collect();
    let magnitude = i128::from_str_radix(&clean, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
