//! A conformance harness for WebAssembly Component-Model script files.
//!
//! cwast reads `.wast` scripts that mix component definitions, instance
//! aliases and assertions, compiles each component with an external
//! text-to-binary compiler, validates it with the runtime under test, and
//! batches everything the runtime must execute into one call per file.
//!
//! # Modules
//!
//! - [`wat`] -- Text scanning: top-level form extraction and an S-expression reader.
//! - [`wast`] -- Script commands: classification, typed constants, the per-file component registry.
//! - [`harness`] -- External tools, the per-file runner, suite discovery and reporting.
//!
//! # Example
//!
//! Classify the forms of a script without running anything:
//!
//! ```
//! use cwast::wast::{classify, Command};
//! use cwast::wat::forms;
//!
//! let script = r#"
//!     (component $c (core module))
//!     (assert_invalid (component (core func)) "type mismatch")
//!     (register "legacy")
//! "#;
//!
//! let kinds: Vec<_> = forms(script)
//!     .map(|form| classify(form.text).unwrap())
//!     .collect();
//! assert!(matches!(kinds[0], Command::Component(_)));
//! assert!(matches!(kinds[1], Command::AssertInvalid { .. }));
//! assert_eq!(kinds[2], Command::Unknown("register".into()));
//! ```
//!
//! Running a suite needs a [`harness::Toolchain`]; the command-line binary
//! uses [`harness::ProcessToolchain`].

pub mod harness;
pub mod wast;
pub mod wat;
