//! Running one script file.
//!
//! Forms are processed strictly in source order: later commands resolve
//! names defined by earlier ones. Component-shaped commands are compiled and
//! validated immediately; anything the runtime must execute is queued into a
//! [`RunScript`] that runs once after the last form. All state (registry,
//! counters, scratch directory, script) lives and dies with the file.

use super::config::HarnessConfig;
use super::report::FileResult;
use super::script::{RunScript, ScriptCommand, ScriptOutcome};
use super::tools::{ToolError, Toolchain, Validation, is_unsupported_error, wit_names_for_path};
use crate::wast::{
    ClassifyError, Command, ComponentForm, ComponentRegistry, Fixture, Invoke, RegistryError, TrapTarget, classify,
};
use crate::wat::forms;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Prefix of per-file scratch directories.
const SCRATCH_PREFIX: &str = "cwast_component_wast_";

/// Run the script at `path`. Never fails: problems reading or running the
/// file are recorded as failures in the result.
pub fn run_file<T: Toolchain + ?Sized>(
    tools: &T,
    path: &Path,
    name: impl Into<String>,
    config: &HarnessConfig,
) -> FileResult {
    let mut result = FileResult::new(name);
    info!(file = %path.display(), "running script");

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            result.fail(format!("#0 read: cannot read {}: {err}", path.display()));
            return result;
        }
    };
    let scratch = match tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir() {
        Ok(dir) => dir,
        Err(err) => {
            result.fail(format!("#0 setup: cannot create scratch directory: {err}"));
            return result;
        }
    };

    let mut session = Session::new(tools, scratch.path(), wit_names_for_path(path), result);
    session.run(&source, config.strict_scan);
    let mut result = session.finish();

    if config.keep_tmp_on_failure && !result.is_clean() {
        #[allow(deprecated)]
        let kept = scratch.into_path();
        result.note(format!("(debug) kept tmp dir: {}", kept.display()));
    } else if let Err(err) = scratch.close() {
        warn!(%err, "failed to remove scratch directory");
    }
    result
}

/// Why a single command failed.
#[derive(Debug, Error)]
enum Failure {
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("{0}")]
    Assertion(String),
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Failure::Assertion(message)
    }
}

/// What became of a command that did not fail here.
enum Step {
    /// Settled locally.
    Passed,
    /// Handed to the runtime batch, which reports its own count.
    Queued,
}

/// Per-file state.
struct Session<'a, T: ?Sized> {
    tools: &'a T,
    scratch: &'a Path,
    wit_names: bool,
    registry: ComponentRegistry,
    script: RunScript,
    artifacts: usize,
    result: FileResult,
}

impl<'a, T: Toolchain + ?Sized> Session<'a, T> {
    fn new(tools: &'a T, scratch: &'a Path, wit_names: bool, result: FileResult) -> Self {
        Self {
            tools,
            scratch,
            wit_names,
            registry: ComponentRegistry::new(),
            script: RunScript::new(),
            artifacts: 0,
            result,
        }
    }

    fn run(&mut self, source: &str, strict_scan: bool) {
        let mut forms = forms(source);
        let mut index = 0;
        for form in forms.by_ref() {
            index += 1;
            let label = form.head().unwrap_or("unknown");
            debug!(index, line = form.line, command = label, "form");
            match self.execute(form.text) {
                Ok(Step::Passed) => self.result.pass(),
                Ok(Step::Queued) => {}
                Err(failure) => {
                    debug!(index, %failure, "command failed");
                    self.result.fail(format!("#{index} {label}: {failure}"));
                }
            }
        }

        if let Some(leftover) = forms.leftover() {
            warn!(file = %self.result.name, %leftover, "ignoring unterminated trailing input");
            if strict_scan {
                self.result.fail(format!("#{} scan: {leftover}", index + 1));
            }
        }

        self.run_script();
    }

    fn finish(self) -> FileResult {
        self.result
    }

    fn execute(&mut self, text: &str) -> Result<Step, Failure> {
        match classify(text)? {
            Command::Component(form) => {
                let binary = self.build(&form, "component")?;
                if let Some(name) = &form.name {
                    self.registry.define(name.clone(), &binary);
                }
                self.script.push(ScriptCommand::Component {
                    name: form.name,
                    path: binary,
                    instantiate: true,
                });
                Ok(Step::Queued)
            }
            Command::Definition(form) => {
                // Named before any tool runs, so numbering does not depend on
                // which definitions compile.
                let name = match &form.name {
                    Some(name) => name.clone(),
                    None => self.registry.next_anonymous_name(),
                };
                let binary = self.build(&form, "component")?;
                self.registry.define(name.clone(), &binary);
                self.script.push(ScriptCommand::ComponentDefinition { name, path: binary });
                Ok(Step::Queued)
            }
            Command::Instance { name, component } => {
                self.registry.alias(name.clone(), &component)?;
                self.script.push(ScriptCommand::ComponentInstance { name, component });
                Ok(Step::Queued)
            }
            Command::AssertInvalid { fixture, message } => self.assert_invalid(fixture, message),
            Command::AssertMalformed { fixture, message } => self.assert_malformed(fixture, message),
            Command::AssertUnlinkable { fixture, message } => match fixture {
                Fixture::Component(form) => {
                    let binary = self.build(&form, "assert_unlinkable")?;
                    self.script.push(ScriptCommand::AssertUnlinkable {
                        path: binary,
                        text: message,
                    });
                    Ok(Step::Queued)
                }
                Fixture::CoreBinary(bytes) => self.expect_module_failure(&bytes, "assert_unlinkable", &message),
            },
            Command::AssertReturn { action, expected } => {
                self.require_instance(&action)?;
                self.script.push(ScriptCommand::AssertReturn { action, expected });
                Ok(Step::Queued)
            }
            Command::AssertTrap { target, message } => match target {
                TrapTarget::Invoke(action) => {
                    self.require_instance(&action)?;
                    self.script.push(ScriptCommand::AssertTrap { action, text: message });
                    Ok(Step::Queued)
                }
                TrapTarget::Instantiate(Fixture::Component(form)) => {
                    let binary = self.build(&form, "assert_trap component")?;
                    self.script.push(ScriptCommand::AssertUnlinkable {
                        path: binary,
                        text: message,
                    });
                    Ok(Step::Queued)
                }
                TrapTarget::Instantiate(Fixture::CoreBinary(bytes)) => {
                    self.expect_module_failure(&bytes, "assert_trap", &message)
                }
            },
            Command::Invoke(action) => {
                self.require_instance(&action)?;
                self.script.push(ScriptCommand::Invoke(action));
                Ok(Step::Queued)
            }
            Command::Unknown(head) => Err(Failure::Assertion(format!("unhandled command: {head}"))),
        }
    }

    // -----------------------------------------------------------------------
    // Assertions settled locally
    // -----------------------------------------------------------------------

    fn assert_invalid(&mut self, fixture: Fixture, message: Option<String>) -> Result<Step, Failure> {
        let form = match fixture {
            Fixture::Component(form) => form,
            Fixture::CoreBinary(bytes) => return self.expect_module_failure(&bytes, "assert_invalid", &message),
        };
        let binary = self
            .compile(&form)
            .map_err(|err| with_message("assert_invalid parse failed", &message) + &format!(": {err}"))?;
        match self.validate(&binary) {
            Validation::Valid(_) => Err(with_message("assert_invalid unexpectedly validated", &message).into()),
            Validation::Invalid(out) if is_unsupported_error(&out) => {
                Err(format!("assert_invalid failed due to unsupported feature: {out}").into())
            }
            Validation::Invalid(_) => Ok(Step::Passed),
            Validation::Unknown(out) => Err(format!("assert_invalid got no validation verdict: {}", or_unknown(&out)).into()),
        }
    }

    fn assert_malformed(&mut self, fixture: Fixture, message: Option<String>) -> Result<Step, Failure> {
        let form = match fixture {
            Fixture::Component(form) => form,
            Fixture::CoreBinary(bytes) => return self.expect_module_failure(&bytes, "assert_malformed", &message),
        };
        let binary = match self.compile(&form) {
            Ok(binary) => binary,
            Err(err) => {
                debug!(%err, "rejected as expected");
                return Ok(Step::Passed);
            }
        };
        let verdict = self.validate(&binary);
        if is_unsupported_error(verdict.output()) {
            return Err(format!("assert_malformed failed due to unsupported feature: {}", verdict.output()).into());
        }
        Err(with_message("assert_malformed unexpectedly parsed", &message).into())
    }

    /// Core binary fixtures pass when the runtime refuses to run them.
    fn expect_module_failure(&mut self, bytes: &[u8], command: &str, message: &Option<String>) -> Result<Step, Failure> {
        let path = self.scratch.join(format!("module_{}.wasm", self.next_artifact()));
        debug!(
            prefix = %hex::encode(&bytes[..bytes.len().min(8)]),
            len = bytes.len(),
            "running core binary fixture"
        );
        fs::write(&path, bytes).map_err(|err| format!("{command} cannot write {}: {err}", path.display()))?;
        match self.tools.run_module(&path) {
            Ok(false) => Ok(Step::Passed),
            Ok(true) => Err(with_message(&format!("{command} unexpectedly ran"), message).into()),
            Err(err) => Err(format!("{command} could not run module: {err}").into()),
        }
    }

    // -----------------------------------------------------------------------
    // Tools
    // -----------------------------------------------------------------------

    fn next_artifact(&mut self) -> usize {
        let idx = self.artifacts;
        self.artifacts += 1;
        idx
    }

    /// Compile and validate; both must succeed.
    fn build(&mut self, form: &ComponentForm, what: &str) -> Result<PathBuf, Failure> {
        let binary = self
            .compile(form)
            .map_err(|err| format!("{what} parse failed: {err}"))?;
        match self.validate(&binary) {
            Validation::Valid(_) => Ok(binary),
            Validation::Invalid(out) | Validation::Unknown(out) => {
                Err(format!("{what} validate failed: {}", or_unknown(&out)).into())
            }
        }
    }

    fn compile(&mut self, form: &ComponentForm) -> Result<PathBuf, ToolError> {
        let idx = self.next_artifact();
        let source = self.scratch.join(format!("component_{idx}.wat"));
        let binary = self.scratch.join(format!("component_{idx}.wasm"));
        fs::write(&source, &form.source)?;
        self.tools.compile(&source, &binary)?;
        Ok(binary)
    }

    /// Validation that could not run at all has no verdict.
    fn validate(&self, binary: &Path) -> Validation {
        self.tools
            .validate(binary, self.wit_names)
            .unwrap_or_else(|err| Validation::Unknown(err.to_string()))
    }

    fn require_instance(&self, action: &Invoke) -> Result<(), RegistryError> {
        match &action.instance {
            Some(name) if !self.registry.contains(name) => Err(RegistryError::UnknownInstance(name.clone())),
            _ => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Runtime batch
    // -----------------------------------------------------------------------

    fn run_script(&mut self) {
        if self.script.is_empty() {
            return;
        }
        info!(commands = self.script.len(), "running component-test batch");
        let output = match self
            .script
            .write_to(self.scratch)
            .map_err(ToolError::from)
            .and_then(|path| self.tools.run_script(&path))
        {
            Ok(output) => output,
            Err(err) => {
                self.result.fail(format!("component-test failed: {err}"));
                return;
            }
        };

        let outcome = ScriptOutcome::parse(&output);
        // Counts come from the runtime and are not trusted.
        self.result.passed = self.result.passed.saturating_add(outcome.passed);
        self.result.failed = self.result.failed.saturating_add(outcome.failed);
        if outcome.skipped > 0 {
            self.result.failed = self.result.failed.saturating_add(outcome.skipped);
            self.result
                .record(format!("component-test skipped {} command(s)", outcome.skipped));
        }
        for detail in outcome.failures {
            self.result.record(detail);
        }
        if !outcome.saw_result {
            self.result.fail(format!("component-test failed: {}", output.trim()));
        }
    }
}

/// `base`, or `base: message` when the assertion carried one.
fn with_message(base: &str, message: &Option<String>) -> String {
    match message {
        Some(message) => format!("{base}: {message}"),
        None => base.to_string(),
    }
}

fn or_unknown(output: &str) -> &str {
    if output.is_empty() { "unknown validation result" } else { output }
}
