//! The batched runtime script and the runtime's report on it.
//!
//! Everything the runtime executes for a file (instantiations, aliases,
//! invocations, link checks) is collected into one [`RunScript`], written as
//! JSON and handed to `component-test` in a single call. The runtime answers
//! with a line-oriented report:
//!
//! ```text
//! FAIL assert_return $c.f: expected u32 5, got u32 4
//! RESULT passed=3 failed=1 skipped=0
//! ```

use crate::wast::{ComponentName, ConstValue, Invoke};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the serialized script inside a scratch directory.
pub const SCRIPT_FILE: &str = "component_script.json";

static COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(passed|failed|skipped)=(\d+)\b").expect("count regex must compile"));

/// One command of the batch, in the runtime's JSON shape. Absent optional
/// fields are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptCommand {
    Component {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<ComponentName>,
        path: PathBuf,
        instantiate: bool,
    },
    ComponentDefinition {
        name: ComponentName,
        path: PathBuf,
    },
    ComponentInstance {
        name: ComponentName,
        component: ComponentName,
    },
    /// Instantiating the component at `path` must fail. Also used for
    /// `assert_trap` around a whole component.
    AssertUnlinkable {
        path: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    AssertReturn {
        #[serde(flatten)]
        action: Invoke,
        expected: Vec<ConstValue>,
    },
    AssertTrap {
        #[serde(flatten)]
        action: Invoke,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Invoke(Invoke),
}

/// The ordered batch for one file.
#[derive(Debug, Default, Serialize)]
pub struct RunScript {
    commands: Vec<ScriptCommand>,
}

impl RunScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: ScriptCommand) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the script as [`SCRIPT_FILE`] in `dir` and return its path.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(SCRIPT_FILE);
        fs::write(&path, self.to_json()?)?;
        Ok(path)
    }
}

/// The runtime's verdict on a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutcome {
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Details from `FAIL` lines, in output order.
    pub failures: Vec<String>,
    /// Whether a `RESULT` line was seen. Without one the counts mean nothing.
    pub saw_result: bool,
}

impl ScriptOutcome {
    pub fn parse(output: &str) -> Self {
        let mut outcome = Self::default();
        for line in output.lines().map(str::trim) {
            if let Some(counts) = line.strip_prefix("RESULT ") {
                outcome.saw_result = true;
                for caps in COUNT.captures_iter(counts) {
                    let Ok(value) = caps[2].parse() else { continue };
                    match &caps[1] {
                        "passed" => outcome.passed = value,
                        "failed" => outcome.failed = value,
                        _ => outcome.skipped = value,
                    }
                }
            } else if let Some(detail) = line.strip_prefix("FAIL ") {
                outcome.failures.push(detail.to_string());
            }
        }
        outcome
    }
}
