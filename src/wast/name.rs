//! The `$name` identifier used to refer to components across commands.

use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// The sigil every component name starts with.
pub const SIGIL: char = '$';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid component name {0:?}: expected `$` followed by an identifier")]
pub struct NameError(pub String);

/// A component or instance name such as `$c`, sigil included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ComponentName(String);

impl ComponentName {
    /// Validate `text` as a name. It must be the sigil followed by at least
    /// one character.
    pub fn new(text: impl Into<String>) -> Result<Self, NameError> {
        let text = text.into();
        match text.strip_prefix(SIGIL) {
            Some(rest) if !rest.is_empty() => Ok(Self(text)),
            _ => Err(NameError(text)),
        }
    }

    /// Parse an atom that may or may not be a name; `None` if it has no sigil.
    pub fn from_atom(atom: &str) -> Option<Self> {
        Self::new(atom).ok()
    }

    /// The synthesized name of the `n`th anonymous definition in a file.
    pub fn from_counter(n: u32) -> Self {
        Self(format!("{SIGIL}anon_def_{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ComponentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ComponentName {
    fn borrow(&self) -> &str {
        &self.0
    }
}
