//! Headless run command

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use tracing::info;

use crate::app::Machine;
use crate::driver::{Clock, ManualClock, SystemClock};
use crate::store::DirStore;

use super::{print_rows, Session, EXIT_ERROR, EXIT_SUCCESS};

/// Wall-clock pause between frames, roughly one display refresh
const FRAME_MS: i64 = 16;

/// Execute the run command.
///
/// With `simulated`, a manual clock is advanced instead of sleeping, so the
/// whole run completes at once.
pub fn run_headless(session: &Session, seconds: u64, simulated: bool) -> ExitCode {
    if simulated {
        let clock = ManualClock::new(SystemClock.now_ms());
        let mut machine = match session.machine(clock.clone()) {
            Ok(m) => m,
            Err(code) => return code,
        };
        drive(&mut machine, seconds, |ms| clock.advance(ms))
    } else {
        let mut machine = match session.machine(SystemClock) {
            Ok(m) => m,
            Err(code) => return code,
        };
        drive(&mut machine, seconds, |ms| thread::sleep(Duration::from_millis(ms as u64)))
    }
}

fn drive<C: Clock>(
    machine: &mut Machine<DirStore, C>,
    seconds: u64,
    mut wait: impl FnMut(i64),
) -> ExitCode {
    let end = machine.clock().now_ms().saturating_add((seconds as i64).saturating_mul(1000));
    let mut cursor = 0;
    let mut frames = 0u64;
    let mut ticks = 0u64;

    loop {
        if machine.frame().is_some() {
            frames += 1;
            ticks += machine.driver().last_ticks() as u64;
        }
        machine.pump();

        print_rows(machine.console().since(cursor));
        cursor = machine.console().pushed();

        if machine.clock().now_ms() >= end {
            break;
        }
        wait(FRAME_MS);
    }

    info!(frames, ticks, "headless run finished");
    eprintln!("Ran {}s: {} frames, {} ticks", seconds, frames, ticks);

    if machine.save_failures() > 0 {
        eprintln!("Error: State could not be saved");
        return ExitCode::from(EXIT_ERROR);
    }
    ExitCode::from(EXIT_SUCCESS)
}
