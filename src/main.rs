//! provmap - command-line tool for inspecting province maps and caches

use std::process::ExitCode;

use provmap::cli;

fn main() -> ExitCode {
    cli::run()
}
