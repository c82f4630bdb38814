//! Classifier for component script forms.
//!
//! Each top-level form is classified on its own. Component bodies are kept as
//! raw source text (normalised so that `(component definition ...)` becomes a
//! plain `(component ...)`); compiling them is left to the external compiler,
//! since `assert_malformed` expects compilation to fail.

use super::command::*;
use super::name::{ComponentName, NameError};
use super::values::{ConstError, InvokeError, decode_const, decode_invoke};
use crate::wat::scanner::{find_nested_form, first_symbol, read_symbol};
use crate::wat::sexpr::{self, NodeList, ReadError, SNode};
use thiserror::Error;

/// Why a form could not be turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("{0}")]
    Read(#[from] ReadError),
    #[error("{0} malformed")]
    Malformed(&'static str),
    #[error("{0} missing component form")]
    MissingComponent(&'static str),
    #[error("{0} uses unsupported component instance form")]
    InstanceFixture(&'static str),
    #[error("unsupported component instance form")]
    InstanceShape,
    #[error("invalid component instance name: {0}")]
    InstanceName(#[from] NameError),
    #[error("{command} unsupported invoke form: {error}")]
    Invoke { command: &'static str, error: InvokeError },
    #[error("{command} unsupported expected value: {error}")]
    Expected { command: &'static str, error: ConstError },
}

/// Classify one top-level form.
///
/// Unrecognised head symbols are not an error; they classify as
/// [`Command::Unknown`] so the caller can count them.
pub fn classify(form: &str) -> Result<Command, ClassifyError> {
    let head = first_symbol(form).unwrap_or("unknown");
    let command = match head {
        "component" => "component",
        "assert_invalid" => "assert_invalid",
        "assert_malformed" => "assert_malformed",
        "assert_unlinkable" => "assert_unlinkable",
        "assert_return" => "assert_return",
        "assert_trap" => "assert_trap",
        "invoke" => "invoke",
        other => return Ok(Command::Unknown(other.to_string())),
    };

    let node = sexpr::read(form)?;
    let list = node.as_list().ok_or(ClassifyError::Malformed(command))?;

    match command {
        "component" => classify_component(form, list),
        "assert_invalid" => Ok(Command::AssertInvalid {
            fixture: parse_fixture(command, form, list)?,
            message: message_at(list, 2),
        }),
        "assert_malformed" => Ok(Command::AssertMalformed {
            fixture: parse_fixture(command, form, list)?,
            message: message_at(list, 2),
        }),
        "assert_unlinkable" => Ok(Command::AssertUnlinkable {
            fixture: parse_fixture(command, form, list)?,
            message: message_at(list, 2),
        }),
        "assert_return" => parse_assert_return(list),
        "assert_trap" => parse_assert_trap(form, list),
        _ => decode_invoke(&node)
            .map(Command::Invoke)
            .map_err(|error| ClassifyError::Invoke { command, error }),
    }
}

// ---------------------------------------------------------------------------
// Component forms
// ---------------------------------------------------------------------------

/// The three shapes a `(component ...)` form can take.
#[derive(Debug, PartialEq, Eq)]
enum Normalized {
    Component(ComponentForm),
    Definition(ComponentForm),
    Instance,
}

/// Normalise component text by reading its leading symbols.
///
/// Works on the source text rather than the tree so the body reaches the
/// compiler exactly as written.
fn normalize_component(form: &str) -> Option<Normalized> {
    let open = form.find('(')?;
    let (head, after_head) = read_symbol(form, open + 1)?;
    if head != "component" {
        return None;
    }
    let text = &form[open..];

    Some(match read_symbol(form, after_head) {
        Some(("definition", after_def)) => {
            let named = read_symbol(form, after_def)
                .and_then(|(sym, end)| ComponentName::from_atom(sym).map(|name| (name, end)));
            Normalized::Definition(match named {
                Some((name, end)) => ComponentForm {
                    source: format!("(component {name}{}", &form[end..]),
                    name: Some(name),
                },
                None => ComponentForm {
                    name: None,
                    source: format!("(component{}", &form[after_def..]),
                },
            })
        }
        Some(("instance", _)) => Normalized::Instance,
        Some((sym, _)) => Normalized::Component(ComponentForm {
            name: ComponentName::from_atom(sym),
            source: text.to_string(),
        }),
        None => Normalized::Component(ComponentForm {
            name: None,
            source: text.to_string(),
        }),
    })
}

fn classify_component(form: &str, list: NodeList<'_>) -> Result<Command, ClassifyError> {
    match normalize_component(form).ok_or(ClassifyError::Malformed("component"))? {
        Normalized::Component(component) => Ok(Command::Component(component)),
        Normalized::Definition(component) => Ok(Command::Definition(component)),
        Normalized::Instance => {
            let (new, existing) = match (list.atom(2), list.atom(3)) {
                (Some(new), Some(existing)) => (new, existing),
                _ => return Err(ClassifyError::InstanceShape),
            };
            Ok(Command::Instance {
                name: ComponentName::new(new)?,
                component: ComponentName::new(existing)?,
            })
        }
    }
}

/// Locate the subject of an assertion: a nested component, or failing that a
/// core `(module binary ...)` in second position.
fn parse_fixture(command: &'static str, form: &str, list: NodeList<'_>) -> Result<Fixture, ClassifyError> {
    if let Some(nested) = find_nested_form(form, "component") {
        return match normalize_component(nested) {
            Some(Normalized::Component(component)) | Some(Normalized::Definition(component)) => {
                Ok(Fixture::Component(component))
            }
            _ => Err(ClassifyError::InstanceFixture(command)),
        };
    }
    list.get(1)
        .and_then(module_binary)
        .map(Fixture::CoreBinary)
        .ok_or(ClassifyError::MissingComponent(command))
}

/// Parse `(module $name? binary "..."*)` into its concatenated bytes.
fn module_binary(node: &SNode) -> Option<Vec<u8>> {
    let list = node.as_list().filter(|l| l.head_atom() == Some("module"))?;
    let mut idx = 1;
    if list.atom(idx).and_then(ComponentName::from_atom).is_some() {
        idx += 1;
    }
    if list.atom(idx) != Some("binary") {
        return None;
    }
    let mut bytes = Vec::new();
    for item in list.iter_from(idx + 1) {
        bytes.extend_from_slice(item.as_str()?);
    }
    Some(bytes)
}

/// The optional trailing string literal of an assertion.
fn message_at(list: NodeList<'_>, index: usize) -> Option<String> {
    list.get(index)
        .and_then(SNode::as_str)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

fn parse_assert_return(list: NodeList<'_>) -> Result<Command, ClassifyError> {
    const COMMAND: &str = "assert_return";
    let action = list.get(1).ok_or(ClassifyError::Malformed(COMMAND))?;
    let action = decode_invoke(action).map_err(|error| ClassifyError::Invoke { command: COMMAND, error })?;
    let expected = list
        .iter_from(2)
        .map(decode_const)
        .collect::<Result<_, _>>()
        .map_err(|error| ClassifyError::Expected { command: COMMAND, error })?;
    Ok(Command::AssertReturn { action, expected })
}

/// `(assert_trap (invoke ...) "msg"?)` or `(assert_trap (component ...) "msg"?)`.
fn parse_assert_trap(form: &str, list: NodeList<'_>) -> Result<Command, ClassifyError> {
    const COMMAND: &str = "assert_trap";
    let subject = list.get(1).ok_or(ClassifyError::Malformed(COMMAND))?;
    let target = if subject.is_list_headed_by("invoke") {
        let action = decode_invoke(subject).map_err(|error| ClassifyError::Invoke { command: COMMAND, error })?;
        TrapTarget::Invoke(action)
    } else {
        TrapTarget::Instantiate(parse_fixture(COMMAND, form, list)?)
    };
    Ok(Command::AssertTrap {
        target,
        message: message_at(list, 2),
    })
}
