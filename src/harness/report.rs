//! Per-file and suite-wide results, and their text rendering.

use std::io::{self, Write};

/// Failure descriptions kept per file. Counting continues past the cap.
pub const MAX_FAILURES: usize = 50;

/// Width of the file-name column in status lines.
const NAME_WIDTH: usize = 50;

/// Outcome of one script file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileResult {
    /// Display name, relative to the suite directory.
    pub name: String,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    failures: Vec<String>,
    notes: Vec<String>,
}

impl FileResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn pass(&mut self) {
        self.passed = self.passed.saturating_add(1);
    }

    /// Count one failed command and keep its description if under the cap.
    pub fn fail(&mut self, detail: impl Into<String>) {
        self.failed = self.failed.saturating_add(1);
        self.record(detail);
    }

    /// Keep a failure description without counting a command; used for
    /// failures whose count arrives separately.
    pub fn record(&mut self, detail: impl Into<String>) {
        if self.failures.len() < MAX_FAILURES {
            self.failures.push(detail.into());
        }
    }

    /// Attach an uncapped informational line, shown after the failures.
    pub fn note(&mut self, text: impl Into<String>) {
        self.notes.push(text.into());
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// `name   [PASS] (pass=N skip=N)` or `[FAIL] (pass=N fail=N skip=N)`,
    /// followed by failure details when `dump_failures` is set.
    pub fn write_status(&self, out: &mut impl Write, dump_failures: bool) -> io::Result<()> {
        if self.is_clean() {
            writeln!(
                out,
                "{:NAME_WIDTH$} [PASS] (pass={} skip={})",
                self.name, self.passed, self.skipped
            )?;
            return Ok(());
        }
        writeln!(
            out,
            "{:NAME_WIDTH$} [FAIL] (pass={} fail={} skip={})",
            self.name, self.passed, self.failed, self.skipped
        )?;
        if dump_failures {
            for line in self.failures.iter().chain(&self.notes) {
                writeln!(out, "  - {line}")?;
            }
        }
        Ok(())
    }
}

/// Totals across a suite run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteResult {
    pub files_total: usize,
    pub files_clean: usize,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl SuiteResult {
    pub fn add(&mut self, file: &FileResult) {
        self.files_total += 1;
        if file.is_clean() {
            self.files_clean += 1;
        }
        self.passed = self.passed.saturating_add(file.passed);
        self.failed = self.failed.saturating_add(file.failed);
        self.skipped = self.skipped.saturating_add(file.skipped);
    }

    pub fn files_failed(&self) -> usize {
        self.files_total - self.files_clean
    }

    /// The suite succeeds iff no command failed anywhere.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn write_summary(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "Summary:")?;
        writeln!(out, "  Files passed:  {}/{}", self.files_clean, self.files_total)?;
        writeln!(out, "  Files failed:  {}", self.files_failed())?;
        writeln!(out, "  Commands passed:  {}", self.passed)?;
        writeln!(out, "  Commands failed:  {}", self.failed)?;
        writeln!(out, "  Commands skipped: {}", self.skipped)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(file: &FileResult, dump: bool) -> String {
        let mut out = Vec::new();
        file.write_status(&mut out, dump).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn clean_file_status_line() {
        let mut file = FileResult::new("a.wast");
        file.pass();
        file.pass();
        let line = render(&file, true);
        assert_eq!(line, format!("{:50} [PASS] (pass=2 skip=0)\n", "a.wast"));
    }

    #[test]
    fn failing_file_dumps_details_only_on_request() {
        let mut file = FileResult::new("dir/b.wast");
        file.pass();
        file.fail("#2 component: component parse failed: boom");
        file.note("(debug) kept tmp dir: /tmp/x");

        let short = render(&file, false);
        assert_eq!(short, format!("{:50} [FAIL] (pass=1 fail=1 skip=0)\n", "dir/b.wast"));

        let long = render(&file, true);
        assert!(long.ends_with(
            "  - #2 component: component parse failed: boom\n  - (debug) kept tmp dir: /tmp/x\n"
        ));
    }

    #[test]
    fn failure_details_are_capped_but_counts_are_not() {
        let mut file = FileResult::new("c.wast");
        for i in 0..60 {
            file.fail(format!("#{i} invoke: nope"));
        }
        file.record("extra");
        assert_eq!(file.failed, 60);
        assert_eq!(file.failures().len(), MAX_FAILURES);
        assert_eq!(file.failures()[49], "#49 invoke: nope");
    }

    #[test]
    fn suite_totals_and_summary() {
        let mut clean = FileResult::new("a.wast");
        clean.pass();
        let mut dirty = FileResult::new("b.wast");
        dirty.pass();
        dirty.fail("x");

        let mut suite = SuiteResult::default();
        suite.add(&clean);
        assert!(suite.is_success());
        suite.add(&dirty);
        assert!(!suite.is_success());
        assert_eq!(suite.files_failed(), 1);

        let mut out = Vec::new();
        suite.write_summary(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "\nSummary:\n  Files passed:  1/2\n  Files failed:  1\n  Commands passed:  2\n  Commands failed:  1\n  Commands skipped: 0\n"
        );
    }
}
