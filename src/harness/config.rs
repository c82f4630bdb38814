use super::HarnessError;
use super::tools::ProcessToolchain;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DIR: &str = "component-spec";
pub const DEFAULT_COMPILER: &str = "wasm-tools";
pub const DEFAULT_RUNTIME: &str = "./wasmoon";

/// Settings for one suite run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Directory holding the `.wast` scripts.
    pub dir: PathBuf,
    /// Search subdirectories too.
    pub recursive: bool,
    /// Print per-command failure details under each failing file.
    pub dump_failures: bool,
    /// Keep a failing file's scratch directory for inspection.
    pub keep_tmp_on_failure: bool,
    pub compiler: PathBuf,
    pub runtime: PathBuf,
    /// Per-call bound on external tools; `None` waits forever.
    pub tool_timeout: Option<Duration>,
    /// Count unterminated trailing input as a failure instead of a warning.
    pub strict_scan: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            dir: DEFAULT_DIR.into(),
            recursive: false,
            dump_failures: false,
            keep_tmp_on_failure: false,
            compiler: DEFAULT_COMPILER.into(),
            runtime: DEFAULT_RUNTIME.into(),
            tool_timeout: None,
            strict_scan: false,
        }
    }
}

impl HarnessConfig {
    /// Check what can be checked before running anything. A runtime given as
    /// a path (rather than a bare command name) must exist.
    pub fn check(&self) -> Result<(), HarnessError> {
        if self.runtime.components().count() > 1 && !self.runtime.exists() {
            return Err(HarnessError::MissingRuntime(self.runtime.clone()));
        }
        if !self.dir.is_dir() {
            return Err(HarnessError::MissingDirectory(self.dir.clone()));
        }
        Ok(())
    }

    pub fn toolchain(&self) -> ProcessToolchain {
        ProcessToolchain::new(&self.compiler, &self.runtime).with_timeout(self.tool_timeout)
    }
}
