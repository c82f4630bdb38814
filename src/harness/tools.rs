//! External tools: the text-to-binary compiler and the runtime under test.
//!
//! The [`Toolchain`] trait is the seam between the runner and real
//! processes. [`ProcessToolchain`] drives the actual binaries; tests substitute
//! a scripted fake.

use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::trace;

/// Validator diagnostics that mean the runtime lacks a feature, rather than
/// that the component is invalid.
pub const UNSUPPORTED_MARKERS: &[&str] = &[
    "unsupported component type opcode",
    "unsupported canon opcode",
    "unsupported component preamble",
    "unsupported string encoding",
    "unsupportedstringencoding",
    "unsupportedcomponent",
];

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    /// Nonzero exit; carries the tool's own diagnostic.
    #[error("{0}")]
    Failed(String),
    #[error("{program} timed out after {after:?}")]
    TimedOut { program: String, after: Duration },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The validator's verdict on a component binary, with its trimmed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid(String),
    Invalid(String),
    /// Neither marker was printed.
    Unknown(String),
}

impl Validation {
    pub fn output(&self) -> &str {
        match self {
            Validation::Valid(out) | Validation::Invalid(out) | Validation::Unknown(out) => out,
        }
    }
}

/// Operations the runner needs from the outside world. Calls block.
pub trait Toolchain {
    /// Compile component text at `source` into a binary at `output`.
    fn compile(&self, source: &Path, output: &Path) -> Result<(), ToolError>;

    /// Validate a component binary. `wit_names` enables WIT name checks.
    fn validate(&self, binary: &Path, wit_names: bool) -> Result<Validation, ToolError>;

    /// Run a core module binary; returns whether it exited successfully.
    fn run_module(&self, binary: &Path) -> Result<bool, ToolError>;

    /// Execute a batch script and return the runtime's combined output.
    fn run_script(&self, script: &Path) -> Result<String, ToolError>;
}

/// Classify combined validator output by its markers.
pub fn classify_validation(output: &str) -> Validation {
    let trimmed = output.trim().to_string();
    if output.contains("validate component error") || output.contains("parse component error") {
        Validation::Invalid(trimmed)
    } else if output.contains("component validated ok") {
        Validation::Valid(trimmed)
    } else {
        Validation::Unknown(trimmed)
    }
}

/// Whether a diagnostic reports a missing runtime feature.
pub fn is_unsupported_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    UNSUPPORTED_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// WIT name checks apply everywhere except the wasmtime-derived scripts,
/// which use arbitrary export names.
pub fn wit_names_for_path(path: &Path) -> bool {
    !path.components().any(|c| c.as_os_str() == "wasmtime")
}

// ---------------------------------------------------------------------------
// Process-backed toolchain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    compiler: PathBuf,
    runtime: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessToolchain {
    pub fn new(compiler: impl Into<PathBuf>, runtime: impl Into<PathBuf>) -> Self {
        Self {
            compiler: compiler.into(),
            runtime: runtime.into(),
            timeout: None,
        }
    }

    /// Bound every tool call; an expired call is killed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn execute(&self, program: &Path, args: &[&OsStr]) -> Result<Output, ToolError> {
        trace!(program = %program.display(), ?args, "running tool");
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());

        let spawn_error = |source| ToolError::Spawn {
            program: program.display().to_string(),
            source,
        };
        match self.timeout {
            None => command.output().map_err(spawn_error),
            Some(limit) => {
                let child = command
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .spawn()
                    .map_err(spawn_error)?;
                wait_with_timeout(program, child, limit)
            }
        }
    }
}

impl Toolchain for ProcessToolchain {
    fn compile(&self, source: &Path, output: &Path) -> Result<(), ToolError> {
        let result = self.execute(
            &self.compiler,
            &["parse".as_ref(), source.as_os_str(), "-o".as_ref(), output.as_os_str()],
        )?;
        if result.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&result.stderr);
        let stdout = String::from_utf8_lossy(&result.stdout);
        let diagnostic = [stderr.trim(), stdout.trim()]
            .into_iter()
            .find(|text| !text.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} parse failed", self.compiler.display()));
        Err(ToolError::Failed(diagnostic))
    }

    fn validate(&self, binary: &Path, wit_names: bool) -> Result<Validation, ToolError> {
        let mut args = vec![OsStr::new("component")];
        if !wit_names {
            args.push(OsStr::new("--no-wit-names"));
        }
        args.extend([OsStr::new("--validate"), binary.as_os_str()]);
        let result = self.execute(&self.runtime, &args)?;
        Ok(classify_validation(&combined(&result)))
    }

    fn run_module(&self, binary: &Path) -> Result<bool, ToolError> {
        let result = self.execute(&self.runtime, &["run".as_ref(), binary.as_os_str()])?;
        Ok(result.status.success())
    }

    fn run_script(&self, script: &Path) -> Result<String, ToolError> {
        let result = self.execute(&self.runtime, &["component-test".as_ref(), script.as_os_str()])?;
        let out = combined(&result);
        if out.trim().is_empty() {
            return Ok(describe_exit(result.status));
        }
        Ok(out)
    }
}

fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

fn describe_exit(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("(exit={code})"),
        None => format!("({status})"),
    }
}

/// Wait for `child`, killing it once `limit` has elapsed. Pipes are drained
/// on separate threads so a chatty child cannot block on a full pipe.
fn wait_with_timeout(program: &Path, mut child: Child, limit: Duration) -> Result<Output, ToolError> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let started = Instant::now();

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(err) => {
                reap(&mut child);
                return Err(err.into());
            }
        }
        if started.elapsed() >= limit {
            reap(&mut child);
            return Err(ToolError::TimedOut {
                program: program.display().to_string(),
                after: limit,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

/// Kill `child` and wait for it. Errors are ignored: the child may already
/// have exited.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        // A read error just truncates the captured output.
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_markers() {
        assert!(matches!(
            classify_validation("validate component error: bad\n"),
            Validation::Invalid(ref out) if out == "validate component error: bad"
        ));
        assert!(matches!(classify_validation("parse component error"), Validation::Invalid(_)));
        assert!(matches!(classify_validation("component validated ok\n"), Validation::Valid(_)));
        assert_eq!(classify_validation("segfault"), Validation::Unknown("segfault".into()));
        assert_eq!(classify_validation("").output(), "");
    }

    #[test]
    fn error_markers_win_over_ok_marker() {
        let out = "component validated ok\nvalidate component error: late";
        assert!(matches!(classify_validation(out), Validation::Invalid(_)));
    }

    #[test]
    fn unsupported_markers_are_case_insensitive() {
        assert!(is_unsupported_error("Validate component error: Unsupported Canon Opcode 0x09"));
        assert!(is_unsupported_error("UnsupportedStringEncoding"));
        assert!(!is_unsupported_error("validate component error: type mismatch"));
    }

    #[test]
    fn wit_names_disabled_under_wasmtime() {
        assert!(wit_names_for_path(Path::new("component-spec/wasm-tools/a.wast")));
        assert!(!wit_names_for_path(Path::new("component-spec/wasmtime/a.wast")));
        assert!(wit_names_for_path(Path::new("component-spec/wasmtime-extra/a.wast")));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let tools = ProcessToolchain::new("/nonexistent/compiler", "/nonexistent/runtime");
        let err = tools.compile(Path::new("a.wat"), Path::new("a.wasm")).unwrap_err();
        assert!(matches!(err, ToolError::Spawn { ref program, .. } if program == "/nonexistent/compiler"));
        assert!(matches!(
            tools.run_script(Path::new("s.json")),
            Err(ToolError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn module_exit_status_is_reported() {
        assert!(ProcessToolchain::new("true", "true").run_module(Path::new("m.wasm")).unwrap());
        assert!(!ProcessToolchain::new("true", "false").run_module(Path::new("m.wasm")).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn validator_output_without_markers_is_unknown() {
        let tools = ProcessToolchain::new("true", "echo");
        let verdict = tools.validate(Path::new("c.wasm"), false).unwrap();
        assert_eq!(verdict, Validation::Unknown("component --no-wit-names --validate c.wasm".into()));
    }

    #[cfg(unix)]
    #[test]
    fn silent_script_run_reports_exit_code() {
        let out = ProcessToolchain::new("true", "false").run_script(Path::new("s.json")).unwrap();
        assert_eq!(out, "(exit=1)");
    }

    #[cfg(unix)]
    #[test]
    fn compile_failure_carries_diagnostic() {
        // `sh parse ...` fails because there is no script named `parse`.
        let tools = ProcessToolchain::new("sh", "true");
        match tools.compile(Path::new("a.wat"), Path::new("a.wasm")) {
            Err(ToolError::Failed(diagnostic)) => assert!(diagnostic.contains("parse")),
            other => panic!("expected compile failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn timed_out_child_is_killed() {
        let child = Command::new("sleep")
            .arg("5")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let started = Instant::now();
        let err = wait_with_timeout(Path::new("sleep"), child, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, ToolError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn reap_kills_and_collects_child() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        reap(&mut child);
        assert!(child.try_wait().unwrap().is_some());

        // Reaping an already finished child is harmless.
        reap(&mut child);
        assert!(child.try_wait().unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn fast_child_output_is_captured_under_timeout() {
        let tools = ProcessToolchain::new("true", "echo").with_timeout(Some(Duration::from_secs(10)));
        let out = tools.run_script(Path::new("s.json")).unwrap();
        assert_eq!(out, "component-test s.json\n");
    }
}
