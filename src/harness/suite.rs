//! Discovering script files and running them as a suite.

use super::HarnessError;
use super::config::HarnessConfig;
use super::report::SuiteResult;
use super::runner::run_file;
use super::tools::Toolchain;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SCRIPT_EXTENSION: &str = "wast";

/// Find `*.wast` files under `dir`, sorted by path. Only the top level is
/// searched unless `recursive` is set.
pub fn discover(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, HarnessError> {
    if !dir.is_dir() {
        return Err(HarnessError::MissingDirectory(dir.to_path_buf()));
    }
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut scripts = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(max_depth) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == SCRIPT_EXTENSION) {
            scripts.push(entry.into_path());
        }
    }
    if scripts.is_empty() {
        return Err(HarnessError::NoScripts(dir.to_path_buf()));
    }
    scripts.sort();
    Ok(scripts)
}

/// Run every script found under `config.dir`, writing status lines and the
/// summary to `out`.
pub fn run_suite<T: Toolchain + ?Sized>(
    tools: &T,
    config: &HarnessConfig,
    out: &mut impl Write,
) -> Result<SuiteResult, HarnessError> {
    let scripts = discover(&config.dir, config.recursive)?;
    writeln!(
        out,
        "Found {} .wast test files in '{}'",
        scripts.len(),
        config.dir.display()
    )?;

    let mut suite = SuiteResult::default();
    for path in &scripts {
        let name = path.strip_prefix(&config.dir).unwrap_or(path).display().to_string();
        let result = run_file(tools, path, name, config);
        result.write_status(out, config.dump_failures)?;
        suite.add(&result);
    }

    suite.write_summary(out)?;
    Ok(suite)
}
