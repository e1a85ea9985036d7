//! Clawdbot - command-line front end for the mood machine

use std::process::ExitCode;

use clawdbot::cli;

fn main() -> ExitCode {
    cli::run()
}
