//! Painting frames into pixels
//!
//! A [`Frame`] is painted into an [`RgbaImage`] at its backing resolution
//! (logical size times device pixel ratio). Shapes are anti-aliased by pixel
//! coverage and composited source-over, the way a 2D canvas would.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::color::TRANSPARENT;
use crate::render::{DrawCommand, Frame, GradientStop, Point};

/// Paint a frame.
///
/// With a `background`, the canvas is flattened over that opaque page colour;
/// without one, untouched pixels stay transparent.
pub fn rasterize(frame: &Frame, background: Option<Rgba<u8>>) -> RgbaImage {
    let (width, height) = frame.viewport.backing_size();
    let scale = frame.viewport.dpr;
    let mut canvas = RgbaImage::from_pixel(width, height, TRANSPARENT);

    for command in &frame.commands {
        match command {
            DrawCommand::Clear => {
                for pixel in canvas.pixels_mut() {
                    *pixel = TRANSPARENT;
                }
            }
            DrawCommand::LinearGradient { from, to, stops } => {
                let (from, to) = (scaled(*from, scale), scaled(*to, scale));
                let (dx, dy) = (to.x - from.x, to.y - from.y);
                let len_sq = dx * dx + dy * dy;
                fill(&mut canvas, |x, y| {
                    let t = if len_sq > 0.0 {
                        ((x - from.x) * dx + (y - from.y) * dy) / len_sq
                    } else {
                        0.0
                    };
                    gradient_at(stops, t)
                });
            }
            DrawCommand::RadialGradient { center, inner, outer, stops } => {
                let center = scaled(*center, scale);
                let (inner, outer) = (inner * scale, outer * scale);
                fill(&mut canvas, |x, y| {
                    let d = (x - center.x).hypot(y - center.y);
                    let t = if outer > inner { (d - inner) / (outer - inner) } else { 1.0 };
                    gradient_at(stops, t)
                });
            }
            DrawCommand::Circle { center, radius, color } => {
                fill_circle(&mut canvas, scaled(*center, scale), radius * scale, *color);
            }
            DrawCommand::Line { from, to, width, color } => {
                stroke_line(
                    &mut canvas,
                    scaled(*from, scale),
                    scaled(*to, scale),
                    width * scale,
                    *color,
                );
            }
        }
    }

    match background {
        Some(page) => {
            let mut flat = RgbaImage::from_pixel(width, height, page);
            for (dst, src) in flat.pixels_mut().zip(canvas.pixels()) {
                *dst = alpha_blend(src, dst, src[3] as f64 / 255.0);
            }
            flat
        }
        None => canvas,
    }
}

/// Paint many frames on the rayon pool, preserving order.
pub fn rasterize_all(frames: &[Frame], background: Option<Rgba<u8>>) -> Vec<RgbaImage> {
    frames.par_iter().map(|frame| rasterize(frame, background)).collect()
}

fn scaled(p: Point, scale: f64) -> Point {
    Point::new(p.x * scale, p.y * scale)
}

/// Colour of a two-stop gradient at `t`, clamped to the end stops
fn gradient_at(stops: &[GradientStop; 2], t: f64) -> Rgba<u8> {
    let [a, b] = stops;
    let span = b.offset - a.offset;
    let f = if span > 0.0 { ((t - a.offset) / span).clamp(0.0, 1.0) } else { 1.0 };
    let mix = |from: u8, to: u8| (from as f64 + (to as f64 - from as f64) * f).round() as u8;
    Rgba([
        mix(a.color[0], b.color[0]),
        mix(a.color[1], b.color[1]),
        mix(a.color[2], b.color[2]),
        mix(a.color[3], b.color[3]),
    ])
}

/// Composite a colour field over every pixel; `shade` gets pixel centres.
fn fill(canvas: &mut RgbaImage, shade: impl Fn(f64, f64) -> Rgba<u8>) {
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let color = shade(x as f64 + 0.5, y as f64 + 0.5);
        if color[3] > 0 {
            *pixel = alpha_blend(&color, pixel, color[3] as f64 / 255.0);
        }
    }
}

/// Pixel bounds `[x0, x1) × [y0, y1)` covering a box, clipped to the canvas
fn clip_box(canvas: &RgbaImage, min: Point, max: Point) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = canvas.dimensions();
    let x0 = min.x.floor().max(0.0);
    let y0 = min.y.floor().max(0.0);
    let x1 = max.x.ceil().min(w as f64);
    let y1 = max.y.ceil().min(h as f64);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

/// Composite `color` scaled by `coverage` over one pixel
fn cover(canvas: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>, coverage: f64) {
    if coverage <= 0.0 {
        return;
    }
    let alpha = color[3] as f64 / 255.0 * coverage.min(1.0);
    let pixel = canvas.get_pixel_mut(x, y);
    *pixel = alpha_blend(&color, pixel, alpha);
}

fn fill_circle(canvas: &mut RgbaImage, center: Point, radius: f64, color: Rgba<u8>) {
    if radius <= 0.0 || color[3] == 0 {
        return;
    }
    let reach = radius + 1.0;
    let Some((x0, y0, x1, y1)) = clip_box(
        canvas,
        Point::new(center.x - reach, center.y - reach),
        Point::new(center.x + reach, center.y + reach),
    ) else {
        return;
    };

    for y in y0..y1 {
        for x in x0..x1 {
            let d = (x as f64 + 0.5 - center.x).hypot(y as f64 + 0.5 - center.y);
            cover(canvas, x, y, color, radius - d + 0.5);
        }
    }
}

fn stroke_line(canvas: &mut RgbaImage, from: Point, to: Point, width: f64, color: Rgba<u8>) {
    if width <= 0.0 || color[3] == 0 {
        return;
    }
    let half = width / 2.0;
    let reach = half + 1.0;
    let Some((x0, y0, x1, y1)) = clip_box(
        canvas,
        Point::new(from.x.min(to.x) - reach, from.y.min(to.y) - reach),
        Point::new(from.x.max(to.x) + reach, from.y.max(to.y) + reach),
    ) else {
        return;
    };

    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let len_sq = dx * dx + dy * dy;
    for y in y0..y1 {
        for x in x0..x1 {
            let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
            let t = if len_sq > 0.0 {
                (((px - from.x) * dx + (py - from.y) * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let d = (px - (from.x + t * dx)).hypot(py - (from.y + t * dy));
            cover(canvas, x, y, color, half - d + 0.5);
        }
    }
}

/// Alpha blend a source pixel onto a destination pixel.
fn alpha_blend(src: &Rgba<u8>, dst: &Rgba<u8>, src_alpha: f64) -> Rgba<u8> {
    let sa = src_alpha;
    let da = dst[3] as f64 / 255.0;

    // Standard "source over" compositing
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f64 / 255.0;
        let df = d as f64 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, NIGHT, WHITE};
    use crate::scene::Viewport;

    fn frame(width: f64, height: f64, dpr: f64, commands: Vec<DrawCommand>) -> Frame {
        Frame { viewport: Viewport::new(width, height, dpr), timestamp: 0.0, commands }
    }

    #[test]
    fn test_output_matches_backing_size() {
        let img = rasterize(&frame(30.0, 20.0, 1.0, vec![DrawCommand::Clear]), None);
        assert_eq!(img.dimensions(), (30, 20));
        let img = rasterize(&frame(30.0, 20.0, 2.0, vec![DrawCommand::Clear]), None);
        assert_eq!(img.dimensions(), (60, 40));
    }

    #[test]
    fn test_background_shows_through_empty_canvas() {
        let f = frame(8.0, 8.0, 1.0, vec![DrawCommand::Clear]);
        assert!(rasterize(&f, None).pixels().all(|p| *p == TRANSPARENT));
        assert!(rasterize(&f, Some(NIGHT)).pixels().all(|p| *p == NIGHT));
    }

    #[test]
    fn test_opaque_circle_covers_centre_only() {
        let f = frame(
            40.0,
            40.0,
            1.0,
            vec![DrawCommand::Circle { center: Point::new(20.0, 20.0), radius: 5.0, color: WHITE }],
        );
        let img = rasterize(&f, None);
        assert_eq!(*img.get_pixel(20, 20), WHITE);
        assert_eq!(*img.get_pixel(0, 0), TRANSPARENT);
        assert_eq!(*img.get_pixel(20, 30), TRANSPARENT);
    }

    #[test]
    fn test_circle_scales_with_ratio() {
        let circle =
            DrawCommand::Circle { center: Point::new(10.0, 10.0), radius: 4.0, color: WHITE };
        let img = rasterize(&frame(20.0, 20.0, 2.0, vec![circle]), None);
        // Logical (10, 13) is 3 units from the centre, inside the disc
        assert_eq!(*img.get_pixel(20, 26), WHITE);
        assert_eq!(*img.get_pixel(20, 36), TRANSPARENT);
    }

    #[test]
    fn test_line_is_drawn_between_endpoints() {
        let line = DrawCommand::Line {
            from: Point::new(2.0, 10.5),
            to: Point::new(18.0, 10.5),
            width: 1.0,
            color: WHITE,
        };
        let img = rasterize(&frame(20.0, 20.0, 1.0, vec![line]), None);
        assert_eq!(*img.get_pixel(10, 10), WHITE);
        assert_eq!(*img.get_pixel(10, 15), TRANSPARENT);
    }

    #[test]
    fn test_linear_gradient_increases_along_axis() {
        let wash = DrawCommand::LinearGradient {
            from: Point::new(0.0, 0.0),
            to: Point::new(100.0, 0.0),
            stops: [GradientStop::new(0.0, Rgba([0, 0, 0, 0])), GradientStop::new(1.0, BLACK)],
        };
        let img = rasterize(&frame(100.0, 4.0, 1.0, vec![wash]), None);
        let left = img.get_pixel(5, 1)[3];
        let right = img.get_pixel(95, 1)[3];
        assert!(left < right);
        // Pixel centre 49.5 sits just before the midpoint
        assert_eq!(img.get_pixel(49, 1)[3], 126);
    }

    #[test]
    fn test_radial_gradient_clear_inside_inner_radius() {
        let vignette = DrawCommand::RadialGradient {
            center: Point::new(50.0, 50.0),
            inner: 20.0,
            outer: 40.0,
            stops: [GradientStop::new(0.0, Rgba([0, 0, 0, 0])), GradientStop::new(1.0, BLACK)],
        };
        let img = rasterize(&frame(100.0, 100.0, 1.0, vec![vignette]), None);
        assert_eq!(img.get_pixel(50, 50)[3], 0);
        assert_eq!(*img.get_pixel(0, 0), BLACK);
    }

    #[test]
    fn test_alpha_blend_over_opaque() {
        let out = alpha_blend(&WHITE, &BLACK, 0.5);
        assert_eq!(out[3], 255);
        assert!((127..=128).contains(&out[0]));
    }

    #[test]
    fn test_rasterize_all_keeps_order() {
        let frames = vec![
            frame(4.0, 4.0, 1.0, vec![]),
            frame(6.0, 4.0, 1.0, vec![]),
            frame(8.0, 4.0, 1.0, vec![]),
        ];
        let widths: Vec<u32> =
            rasterize_all(&frames, Some(NIGHT)).iter().map(|i| i.width()).collect();
        assert_eq!(widths, vec![4, 6, 8]);
    }
}
