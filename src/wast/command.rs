//! Command types for component-model script (.wast) files.
//!
//! A script is a sequence of top-level forms. Each one classifies into a
//! [`Command`]: a component to compile, an alias of an existing component, an
//! assertion about some component text, or an action run by the runtime.

use super::name::ComponentName;
use super::values::ConstValue;
use serde::Serialize;

/// A top-level command in a component script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `(component $name? ...)`: compile, validate, and instantiate.
    Component(ComponentForm),

    /// `(component definition $name? ...)`: compile and validate only.
    Definition(ComponentForm),

    /// `(component instance $new $existing)`: bind a new name to an
    /// already-defined component.
    Instance { name: ComponentName, component: ComponentName },

    /// The component must fail validation.
    AssertInvalid { fixture: Fixture, message: Option<String> },

    /// The component text must fail to compile.
    AssertMalformed { fixture: Fixture, message: Option<String> },

    /// The component must validate but fail to link in the runtime.
    AssertUnlinkable { fixture: Fixture, message: Option<String> },

    /// The action must return exactly these values.
    AssertReturn { action: Invoke, expected: Vec<ConstValue> },

    /// The action, or instantiating the component, must trap.
    AssertTrap { target: TrapTarget, message: Option<String> },

    /// A top-level action whose result is ignored.
    Invoke(Invoke),

    /// Anything else, keyed by its head symbol.
    Unknown(String),
}

/// Component source text ready to hand to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentForm {
    /// The explicit `$name`, if the form had one.
    pub name: Option<ComponentName>,
    /// Normalised text: always starts with `(component`, never with
    /// `(component definition`.
    pub source: String,
}

/// The subject of an assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fixture {
    Component(ComponentForm),
    /// A core `(module binary "...")`, as raw bytes. Some upstream component
    /// suites keep core binary fixtures alongside the component scripts.
    CoreBinary(Vec<u8>),
}

/// What an `assert_trap` exercises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrapTarget {
    Invoke(Invoke),
    /// Instantiation itself is expected to trap.
    Instantiate(Fixture),
}

/// `(invoke $instance? "field" args...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoke {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<ComponentName>,
    pub field: String,
    pub args: Vec<ConstValue>,
}

impl Command {
    /// The component or instance this command depends on already existing.
    pub fn referenced_name(&self) -> Option<&ComponentName> {
        match self {
            Command::Instance { component, .. } => Some(component),
            Command::AssertReturn { action, .. }
            | Command::AssertTrap {
                target: TrapTarget::Invoke(action),
                ..
            }
            | Command::Invoke(action) => action.instance.as_ref(),
            _ => None,
        }
    }
}
