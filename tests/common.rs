//! Common test utilities shared between integration tests

#![allow(dead_code)]

use cwast::harness::{FileResult, HarnessConfig, ToolError, Toolchain, Validation, run_file};
use cwast::harness::tools::classify_validation;
use std::cell::RefCell;
use std::fs;
use std::path::Path;

/// A tool invocation observed by [`FakeToolchain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Component source text handed to the compiler.
    Compile(String),
    Validate { wit_names: bool },
    RunModule(Vec<u8>),
    RunScript,
}

type CompileRule = Box<dyn Fn(&str) -> Result<(), String>>;
type ValidateRule = Box<dyn Fn(&str) -> String>;
type ScriptRule = Box<dyn Fn(&serde_json::Value) -> String>;

/// Scripted stand-in for the compiler and runtime.
///
/// The fake "binary" written by `compile` is the component text itself, so
/// validation rules can decide per component. By default everything
/// compiles and validates, core modules fail to run, and the runtime reports
/// every batched command as passed.
pub struct FakeToolchain {
    compile: CompileRule,
    validate: ValidateRule,
    module_runs: bool,
    script: ScriptRule,
    calls: RefCell<Vec<Call>>,
    scripts: RefCell<Vec<serde_json::Value>>,
}

impl Default for FakeToolchain {
    fn default() -> Self {
        Self {
            compile: Box::new(|_| Ok(())),
            validate: Box::new(|_| "component validated ok".to_string()),
            module_runs: false,
            script: Box::new(|script| {
                let count = script["commands"].as_array().map_or(0, Vec::len);
                format!("RESULT passed={count} failed=0 skipped=0")
            }),
            calls: RefCell::new(Vec::new()),
            scripts: RefCell::new(Vec::new()),
        }
    }
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compilation fails for any component whose text contains `marker`.
    pub fn reject_compile(mut self, marker: &'static str) -> Self {
        self.compile = Box::new(move |text| {
            if text.contains(marker) {
                Err(format!("error: unexpected token `{marker}`"))
            } else {
                Ok(())
            }
        });
        self
    }

    /// Validator output is produced from the component text.
    pub fn validate_with(mut self, rule: impl Fn(&str) -> String + 'static) -> Self {
        self.validate = Box::new(rule);
        self
    }

    /// The validator prints `output` for every component.
    pub fn validator_says(self, output: &'static str) -> Self {
        self.validate_with(move |_| output.to_string())
    }

    pub fn module_runs(mut self, runs: bool) -> Self {
        self.module_runs = runs;
        self
    }

    /// The runtime prints `output` for any batch.
    pub fn script_says(mut self, output: &'static str) -> Self {
        self.script = Box::new(move |_| output.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// The batch scripts handed to the runtime, parsed.
    pub fn scripts(&self) -> Vec<serde_json::Value> {
        self.scripts.borrow().clone()
    }
}

impl Toolchain for FakeToolchain {
    fn compile(&self, source: &Path, output: &Path) -> Result<(), ToolError> {
        let text = fs::read_to_string(source)?;
        self.calls.borrow_mut().push(Call::Compile(text.clone()));
        (self.compile)(&text).map_err(ToolError::Failed)?;
        fs::write(output, text)?;
        Ok(())
    }

    fn validate(&self, binary: &Path, wit_names: bool) -> Result<Validation, ToolError> {
        let text = fs::read_to_string(binary)?;
        self.calls.borrow_mut().push(Call::Validate { wit_names });
        Ok(classify_validation(&(self.validate)(&text)))
    }

    fn run_module(&self, binary: &Path) -> Result<bool, ToolError> {
        let bytes = fs::read(binary)?;
        self.calls.borrow_mut().push(Call::RunModule(bytes));
        Ok(self.module_runs)
    }

    fn run_script(&self, script: &Path) -> Result<String, ToolError> {
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(script)?).map_err(|e| ToolError::Failed(e.to_string()))?;
        self.calls.borrow_mut().push(Call::RunScript);
        let output = (self.script)(&json);
        self.scripts.borrow_mut().push(json);
        Ok(output)
    }
}

/// Write `source` to a script file under `subdir` and run it.
pub fn run_script_in(subdir: &str, source: &str, tools: &FakeToolchain, config: &HarnessConfig) -> FileResult {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(subdir).join("case.wast");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, source).unwrap();
    run_file(tools, &path, "case.wast", config)
}

/// Write `source` to a script file and run it with the default config.
pub fn run_script(source: &str, tools: &FakeToolchain) -> FileResult {
    run_script_in("", source, tools, &HarnessConfig::default())
}
