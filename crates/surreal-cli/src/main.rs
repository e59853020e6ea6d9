//! Entry point for the `surreal-rpc` probe.
//!
//! Delegates to [`surreal_cli::run`], which loads configuration, connects to
//! the configured server, and reports its version.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    surreal_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
