//! Per-tick state transition and beacon link computation
//!
//! One tick is 1/60 s of simulated time regardless of how often the host
//! displays frames. The frame driver decides how many ticks a frame covers.

use crate::models::Beacon;
use crate::scene::Scene;

/// Simulated milliseconds per tick
pub const TICK_MS: f64 = 1000.0 / 60.0;

/// Beacon age added per tick, in seconds
pub const BEACON_AGE_STEP: f64 = 0.016;

/// Velocity multiplier applied to every particle each tick
pub const DAMPING: f64 = 0.97;

/// Beacons further apart than this are not linked
pub const LINK_DISTANCE: f64 = 520.0;

/// Opacity of a link between two coincident beacons
pub const LINK_MAX_ALPHA: f64 = 0.22;

/// Distance over which link opacity falls by 1.0
const LINK_FALLOFF: f64 = 2600.0;

/// Advance the scene by one tick.
///
/// Stars twinkle, beacons age, particles move, slow down and age; particles
/// that reach their lifetime are removed.
pub fn tick(scene: &mut Scene) {
    for star in &mut scene.stars {
        star.phase += star.speed;
    }

    for beacon in &mut scene.record.beacons {
        beacon.t += BEACON_AGE_STEP;
    }

    for p in &mut scene.particles {
        p.x += p.vx;
        p.y += p.vy;
        p.vx *= DAMPING;
        p.vy *= DAMPING;
        p.age += 1;
    }
    scene.particles.retain(|p| !p.is_expired());
}

/// A faint line between two nearby beacons
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    /// Index of the first beacon
    pub a: usize,
    /// Index of the second beacon
    pub b: usize,
    pub distance: f64,
    pub alpha: f64,
}

/// Opacity of a link at `distance`, or `None` when too far to draw.
pub fn link_alpha(distance: f64) -> Option<f64> {
    if distance < LINK_DISTANCE {
        Some((LINK_MAX_ALPHA - distance / LINK_FALLOFF).clamp(0.0, LINK_MAX_ALPHA))
    } else {
        None
    }
}

/// Every unordered pair of beacons close enough to be linked.
///
/// Quadratic in the beacon count, which is capped small.
pub fn beacon_links(beacons: &[Beacon]) -> Vec<Link> {
    let mut links = Vec::new();
    for i in 0..beacons.len() {
        for j in (i + 1)..beacons.len() {
            let distance = (beacons[i].x - beacons[j].x).hypot(beacons[i].y - beacons[j].y);
            if let Some(alpha) = link_alpha(distance) {
                links.push(Link { a: i, b: j, distance, alpha });
            }
        }
    }
    links
}
