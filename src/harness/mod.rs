//! Driving component scripts through the external toolchain.
//!
//! Per file: scan forms, classify each, compile and validate components,
//! settle what can be settled locally, and batch the rest into one runtime
//! call. Per suite: discover files, run each with fresh state, and total the
//! results.

pub mod config;
pub mod report;
pub mod runner;
pub mod script;
pub mod suite;
pub mod tools;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub use config::HarnessConfig;
pub use report::{FileResult, MAX_FAILURES, SuiteResult};
pub use runner::run_file;
pub use script::{RunScript, ScriptCommand, ScriptOutcome};
pub use suite::{discover, run_suite};
pub use tools::{ProcessToolchain, ToolError, Toolchain, Validation};

/// Problems that stop a suite from running at all.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("runtime binary '{}' not found", .0.display())]
    MissingRuntime(PathBuf),
    #[error("directory '{}' does not exist", .0.display())]
    MissingDirectory(PathBuf),
    #[error("no .wast files found in '{}'", .0.display())]
    NoScripts(PathBuf),
    #[error("failed to walk test directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
