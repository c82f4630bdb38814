//! Component-model script (.wast) commands.
//!
//! This module turns the top-level forms of a component script into typed
//! commands. It does NOT compile component bodies; those are kept as raw
//! source text (normalised to a plain `(component ...)`) so the runner can
//! hand them to an external compiler and decide whether failure was expected.
//!
//! # Example
//!
//! ```
//! use cwast::wast::{classify, Command};
//! use cwast::wat::forms;
//!
//! let source = r#"
//!     (component definition $d (core module))
//!     (assert_return (invoke $d "f") (u32.const 42))
//! "#;
//! let commands: Vec<_> = forms(source).map(|f| classify(f.text).unwrap()).collect();
//! assert!(matches!(commands[0], Command::Definition(_)));
//! assert!(matches!(commands[1], Command::AssertReturn { .. }));
//! ```

pub mod command;
pub mod name;
mod parser;
pub mod registry;
pub mod values;

pub use command::*;
pub use name::{ComponentName, NameError};
pub use parser::{ClassifyError, classify};
pub use registry::{ComponentRegistry, RegistryError};
pub use values::{ConstError, ConstValue, InvokeError, decode_const, decode_invoke};
