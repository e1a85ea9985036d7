//! Scene to drawing commands
//!
//! [`render`] reads a [`Scene`] and a timestamp and returns a [`Frame`]: the
//! ordered list of shapes to paint. It never mutates the scene; advancing
//! time is [`crate::simulation::tick`]'s job. Painting the commands into
//! pixels is [`crate::raster`]'s.

use image::Rgba;

use crate::color::{with_alpha, Theme, BLACK, WHITE};
use crate::scene::{Scene, Viewport};
use crate::simulation::beacon_links;

/// A point in logical surface units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One colour stop of a two-stop gradient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// Position along the gradient, 0.0..=1.0
    pub offset: f64,
    pub color: Rgba<u8>,
}

impl GradientStop {
    pub fn new(offset: f64, color: Rgba<u8>) -> Self {
        Self { offset, color }
    }
}

/// A single drawing operation, in painting order within a [`Frame`]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Reset the whole surface to transparent
    Clear,
    /// Fill the surface with a gradient along the `from` → `to` axis
    LinearGradient { from: Point, to: Point, stops: [GradientStop; 2] },
    /// Fill the surface with a gradient between two concentric circles
    RadialGradient { center: Point, inner: f64, outer: f64, stops: [GradientStop; 2] },
    /// Filled disc
    Circle { center: Point, radius: f64, color: Rgba<u8> },
    /// Stroked segment
    Line { from: Point, to: Point, width: f64, color: Rgba<u8> },
}

/// Everything needed to paint one picture of the scene
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub viewport: Viewport,
    /// Timestamp the frame was rendered for, in milliseconds
    pub timestamp: f64,
    pub commands: Vec<DrawCommand>,
}

impl Frame {
    /// Number of discs in the frame
    pub fn circle_count(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, DrawCommand::Circle { .. })).count()
    }

    /// Number of line segments in the frame
    pub fn line_count(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, DrawCommand::Line { .. })).count()
    }
}

const WASH_FROM_ALPHA: f64 = 0.35;
const WASH_TO_ALPHA: f64 = 0.60;
const SHADOW_ALPHA: f64 = 0.55;
const HALO_ALPHA: f64 = 0.22;
const CORE_ALPHA: f64 = 0.9;
const CORE_RADIUS: f64 = 2.6;
const PARTICLE_ALPHA: f64 = 0.6;
const VIGNETTE_ALPHA: f64 = 0.65;
const VIGNETTE_INNER: f64 = 40.0;

/// Star opacity for a twinkle phase: 0.18 at the trough, 0.56 at the peak.
pub fn star_alpha(phase: f64) -> f64 {
    0.18 + 0.38 * (0.5 + 0.5 * phase.sin())
}

/// Beacon pulse radius at `timestamp` ms: 6 at the trough, 12 at the peak.
pub fn beacon_pulse(timestamp: f64, phase: f64) -> f64 {
    6.0 + 6.0 * (0.5 + 0.5 * (timestamp * 0.002 + phase).sin())
}

/// Paint order: wash, stars, links, beacons, particles, vignette.
pub fn render(scene: &Scene, theme: &Theme, timestamp: f64) -> Frame {
    let viewport = scene.viewport;
    let (w, h) = (viewport.width, viewport.height);
    let beacons = &scene.record.beacons;

    let shapes = scene.stars.len() + beacons.len() * 3 + scene.particles.len();
    let mut commands = Vec::with_capacity(3 + shapes + beacons.len().pow(2) / 2);

    commands.push(DrawCommand::Clear);
    commands.push(DrawCommand::LinearGradient {
        from: Point::new(0.0, 0.0),
        to: Point::new(w, h),
        stops: [
            GradientStop::new(0.0, with_alpha(BLACK, WASH_FROM_ALPHA)),
            GradientStop::new(1.0, with_alpha(BLACK, WASH_TO_ALPHA)),
        ],
    });

    for star in &scene.stars {
        commands.push(DrawCommand::Circle {
            center: Point::new(star.x, star.y),
            radius: star.radius,
            color: with_alpha(WHITE, star_alpha(star.phase)),
        });
    }

    for link in beacon_links(beacons) {
        let (a, b) = (&beacons[link.a], &beacons[link.b]);
        commands.push(DrawCommand::Line {
            from: Point::new(a.x, a.y),
            to: Point::new(b.x, b.y),
            width: 1.0,
            color: with_alpha(theme.link, link.alpha),
        });
    }

    let halo = with_alpha(theme.halo(scene.record.mood), HALO_ALPHA);
    for beacon in beacons {
        let center = Point::new(beacon.x, beacon.y);
        let pulse = beacon_pulse(timestamp, beacon.phase);
        commands.push(DrawCommand::Circle {
            center,
            radius: pulse + 4.0,
            color: with_alpha(BLACK, SHADOW_ALPHA),
        });
        commands.push(DrawCommand::Circle { center, radius: pulse + 10.0, color: halo });
        commands.push(DrawCommand::Circle {
            center,
            radius: CORE_RADIUS,
            color: with_alpha(WHITE, CORE_ALPHA),
        });
    }

    for p in &scene.particles {
        let fade = 1.0 - p.normalized_age();
        commands.push(DrawCommand::Circle {
            center: Point::new(p.x, p.y),
            radius: p.radius,
            color: with_alpha(theme.particle, PARTICLE_ALPHA * fade),
        });
    }

    commands.push(DrawCommand::RadialGradient {
        center: Point::new(w * 0.5, h * 0.55),
        inner: VIGNETTE_INNER,
        outer: w.max(h) * 0.55,
        stops: [
            GradientStop::new(0.0, with_alpha(BLACK, 0.0)),
            GradientStop::new(1.0, with_alpha(BLACK, VIGNETTE_ALPHA)),
        ],
    });

    Frame { viewport, timestamp, commands }
}
