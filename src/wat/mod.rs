//! WebAssembly text-format scanning and reading.
//!
//! Two layers, both lenient about string escapes:
//!
//! - [`scanner`] finds form boundaries in a whole script without tokenising,
//!   skipping comments and string literals.
//! - [`sexpr`] reads one form into an [`SNode`] tree.
//!
//! # Example
//!
//! ```
//! use cwast::wat::{forms, read};
//!
//! let source = "(component $c) ;; trailing\n(invoke $c \"run\")";
//! let nodes: Vec<_> = forms(source).map(|f| read(f.text).unwrap()).collect();
//! assert_eq!(nodes.len(), 2);
//! assert!(nodes[1].is_list_headed_by("invoke"));
//! ```

mod cursor;
pub mod scanner;
pub mod sexpr;

pub use scanner::{Form, Forms, Leftover, LeftoverKind, forms};
pub use sexpr::{NodeList, ReadError, SNode, read};
