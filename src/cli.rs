use clap::Parser;
use cwast::harness::HarnessConfig;
use cwast::harness::config::{DEFAULT_COMPILER, DEFAULT_DIR, DEFAULT_RUNTIME};
use std::path::PathBuf;
use std::time::Duration;

/// Run component-model .wast tests
#[derive(Parser, Debug)]
#[command(name = "cwast", version, about)]
pub struct Cli {
    /// Directory containing .wast files
    #[arg(long, default_value = DEFAULT_DIR)]
    pub dir: PathBuf,

    /// Recursively search subdirectories for .wast files
    #[arg(long)]
    pub rec: bool,

    /// Print per-file failure details
    #[arg(long)]
    pub dump_failures: bool,

    /// Keep per-file temporary directories when a file fails (debug)
    #[arg(long)]
    pub keep_tmp_on_failure: bool,

    /// Text-to-binary compiler, invoked as `<compiler> parse <src> -o <out>`
    #[arg(long, default_value = DEFAULT_COMPILER)]
    pub compiler: PathBuf,

    /// Runtime under test
    #[arg(long, default_value = DEFAULT_RUNTIME)]
    pub runtime: PathBuf,

    /// Kill any single tool call that runs longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub tool_timeout: Option<u64>,

    /// Fail a file whose text ends inside an unterminated string, comment or form
    #[arg(long)]
    pub strict_scan: bool,
}

impl Cli {
    pub fn into_config(self) -> HarnessConfig {
        HarnessConfig {
            dir: self.dir,
            recursive: self.rec,
            dump_failures: self.dump_failures,
            keep_tmp_on_failure: self.keep_tmp_on_failure,
            compiler: self.compiler,
            runtime: self.runtime,
            tool_timeout: self.tool_timeout.map(Duration::from_secs),
            strict_scan: self.strict_scan,
        }
    }
}
