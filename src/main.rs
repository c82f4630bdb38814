//! cwast command-line entry point.

mod cli;

use clap::Parser;
use cli::Cli;
use cwast::harness::run_suite;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cwast=warn")))
        .with_writer(io::stderr)
        .init();

    let config = Cli::parse().into_config();
    if let Err(err) = config.check() {
        println!("Error: {err}");
        return ExitCode::FAILURE;
    }

    let tools = config.toolchain();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = run_suite(&tools, &config, &mut out);
    // A closed stdout is not worth reporting.
    let _ = out.flush();

    match result {
        Ok(suite) if suite.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            error!(%err, "suite aborted");
            println!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
