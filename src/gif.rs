//! Animated GIF recording of rendered frames

use crate::output::{ensure_parent, OutputError};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Per-frame delay in centiseconds for a frame rate, never below one.
///
/// GIF stores delays in 1/100 s, so 60 fps rounds to 2 cs (50 fps playback).
pub fn frame_delay_cs(fps: u32) -> u16 {
    let fps = fps.max(1);
    let cs = (100 + fps / 2) / fps;
    cs.clamp(1, u16::MAX as u32) as u16
}

/// Write a sequence of frames as an animated GIF.
///
/// An empty sequence writes nothing.
pub fn render_gif(
    frames: &[RgbaImage],
    fps: u32,
    loop_anim: bool,
    path: &Path,
) -> Result<(), OutputError> {
    if frames.is_empty() {
        return Ok(());
    }

    ensure_parent(path)?;

    let file = File::create(path)?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));

    let repeat = if loop_anim { Repeat::Infinite } else { Repeat::Finite(0) };
    encoder.set_repeat(repeat)?;

    let delay_ms = frame_delay_cs(fps) as u32 * 10;
    for rgba_image in frames {
        let delay = Delay::from_numer_denom_ms(delay_ms, 1);
        encoder.encode_frame(Frame::from_parts(rgba_image.clone(), 0, 0, delay))?;
    }

    Ok(())
}
