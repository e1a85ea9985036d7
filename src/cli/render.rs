//! Snapshot and record commands (PNG and GIF output)
//!
//! Both work on a scratch copy of the stored record, so rendering never
//! changes the saved state.

use std::path::Path;
use std::process::ExitCode;

use image::Rgba;

use crate::app::Machine;
use crate::driver::ManualClock;
use crate::gif::render_gif;
use crate::output::save_png;
use crate::raster::{rasterize, rasterize_all};
use crate::render::Frame;
use crate::simulation::TICK_MS;
use crate::store::{MemoryStore, StateStore};

use super::{Session, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

type Preview = Machine<MemoryStore, ManualClock>;

/// A machine over an in-memory copy of the stored record.
fn preview(session: &Session) -> Result<Preview, ExitCode> {
    let key = session.config.storage.key.clone();
    let record = StateStore::with_key(session.open_kv()?, key.clone()).load();

    let mut scratch = StateStore::with_key(MemoryStore::new(), key);
    if let Err(e) = scratch.save(&record) {
        eprintln!("Error: Cannot copy state: {}", e);
        return Err(ExitCode::from(EXIT_ERROR));
    }
    Ok(Machine::new(scratch, ManualClock::new(0), session.options()?))
}

fn background(session: &Session) -> Result<Rgba<u8>, ExitCode> {
    session.config.background().map_err(|e| {
        eprintln!("Error: Invalid background colour: {}", e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })
}

/// Ticks between two recorded frames at `fps`
pub(crate) fn ticks_per_frame(fps: u32) -> u32 {
    let frame_ms = 1000.0 / fps.max(1) as f64;
    ((frame_ms / TICK_MS).round() as u32).max(1)
}

/// Execute the snapshot command
pub fn run_snapshot(
    session: &Session,
    output: &Path,
    at: f64,
    ticks: u32,
    bloom: bool,
) -> ExitCode {
    if !at.is_finite() || at < 0.0 {
        eprintln!("Error: --at must be a non-negative number of milliseconds");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }
    let background = match background(session) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let mut machine = match preview(session) {
        Ok(m) => m,
        Err(code) => return code,
    };
    if bloom {
        machine.bloom();
    }

    let frame = machine.step(ticks, at);
    let image = rasterize(&frame, Some(background));
    if let Err(e) = save_png(&image, output) {
        eprintln!("Error: Failed to save '{}': {}", output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    println!(
        "Saved: {} ({}x{}, {} circles, {} lines)",
        output.display(),
        image.width(),
        image.height(),
        frame.circle_count(),
        frame.line_count()
    );
    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the record command
pub fn run_record(
    session: &Session,
    output: &Path,
    frames: u32,
    fps: u32,
    bloom: bool,
) -> ExitCode {
    let background = match background(session) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let mut machine = match preview(session) {
        Ok(m) => m,
        Err(code) => return code,
    };
    if bloom {
        machine.bloom();
    }

    let step = ticks_per_frame(fps);
    let frame_ms = 1000.0 / fps as f64;
    let commands: Vec<Frame> = (0..frames)
        .map(|i| machine.step(if i == 0 { 0 } else { step }, i as f64 * frame_ms))
        .collect();

    let images = rasterize_all(&commands, Some(background));
    if let Err(e) = render_gif(&images, fps, true, output) {
        eprintln!("Error: Failed to save '{}': {}", output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    println!("Saved: {} ({} frames at {} fps)", output.display(), frames, fps);
    ExitCode::from(EXIT_SUCCESS)
}
