//! The owned simulation context
//!
//! A [`Scene`] holds everything the animation needs: the persisted
//! [`Record`] (beacons, mood, drift, ...) plus the ephemeral star field and
//! bloom particles, the surface size and the seeded random source. It is
//! passed explicitly to [`crate::simulation::tick`] and
//! [`crate::render::render`].

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::models::{Beacon, Record};

/// Default number of beacons kept before the oldest is evicted
pub const DEFAULT_BEACON_CAPACITY: usize = 20;

const STARS_NORMAL: usize = 140;
const STARS_REDUCED: usize = 60;
const BLOOM_NORMAL: usize = 70;
const BLOOM_REDUCED: usize = 30;
/// Per-axis bound of a bloom particle's initial velocity (before strength)
const BLOOM_SPEED: f64 = 2.2;

/// Whether the host asked for reduced motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Motion {
    #[default]
    Full,
    Reduced,
}

impl Motion {
    pub fn from_reduced(reduced: bool) -> Self {
        if reduced {
            Motion::Reduced
        } else {
            Motion::Full
        }
    }

    pub fn is_reduced(&self) -> bool {
        matches!(self, Motion::Reduced)
    }
}

/// Logical size of the drawing surface and its device pixel ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Device pixel ratio, clamped to 1..=2
    pub dpr: f64,
}

impl Viewport {
    /// Logical sizes are floored to whole units; the ratio is clamped to 1..=2.
    pub fn new(width: f64, height: f64, dpr: f64) -> Self {
        let dpr = if dpr.is_finite() { dpr.clamp(1.0, 2.0) } else { 1.0 };
        Self { width: width.max(0.0).floor(), height: height.max(0.0).floor(), dpr }
    }

    /// Size of the backing pixel buffer
    pub fn backing_size(&self) -> (u32, u32) {
        ((self.width * self.dpr).floor() as u32, (self.height * self.dpr).floor() as u32)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0, 1.0)
    }
}

/// A background twinkling dot
#[derive(Debug, Clone, PartialEq)]
pub struct Star {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// Twinkle phase in radians
    pub phase: f64,
    /// Phase advance per tick
    pub speed: f64,
}

/// A short-lived bloom particle
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Age in ticks
    pub age: u32,
    /// Tick count at which the particle expires
    pub lifetime: u32,
    pub radius: f64,
}

impl Particle {
    /// Returns the normalized age (0.0 = just born, 1.0 = expired).
    pub fn normalized_age(&self) -> f64 {
        if self.lifetime == 0 {
            1.0
        } else {
            self.age as f64 / self.lifetime as f64
        }
    }

    pub fn is_expired(&self) -> bool {
        self.age >= self.lifetime
    }
}

/// Everything the frame loop reads and writes
#[derive(Debug, Clone)]
pub struct Scene {
    pub record: Record,
    pub stars: Vec<Star>,
    pub particles: Vec<Particle>,
    pub viewport: Viewport,
    pub motion: Motion,
    beacon_capacity: usize,
    rng: StdRng,
}

impl Scene {
    /// Build a scene around a loaded record and seed its star field.
    ///
    /// A `seed` makes every random choice reproducible; without one the
    /// generator is seeded from the OS.
    pub fn new(record: Record, viewport: Viewport, motion: Motion, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut scene = Self {
            record,
            stars: Vec::new(),
            particles: Vec::new(),
            viewport,
            motion,
            beacon_capacity: DEFAULT_BEACON_CAPACITY,
            rng,
        };
        scene.trim_beacons();
        scene.seed_stars();
        scene
    }

    pub fn with_beacon_capacity(mut self, capacity: usize) -> Self {
        self.beacon_capacity = capacity.max(1);
        self.trim_beacons();
        self
    }

    pub fn beacon_capacity(&self) -> usize {
        self.beacon_capacity
    }

    /// Replace the star field with a fresh batch sized by the motion preference.
    pub fn seed_stars(&mut self) {
        let count = if self.motion.is_reduced() { STARS_REDUCED } else { STARS_NORMAL };
        let (w, h) = (self.viewport.width, self.viewport.height);
        let rng = &mut self.rng;
        self.stars = (0..count)
            .map(|_| Star {
                x: rng.random::<f64>() * w,
                y: rng.random::<f64>() * h,
                radius: rng.random_range(0.6..2.0),
                phase: rng.random_range(0.0..TAU),
                speed: rng.random_range(0.002..0.016),
            })
            .collect();
        debug!(count, width = w, height = h, "star field seeded");
    }

    /// Change the surface size and re-seed the stars to cover it.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.seed_stars();
    }

    /// Append a beacon with a random phase, evicting the oldest beyond capacity.
    ///
    /// Returns the evicted beacon, if any.
    pub fn add_beacon(&mut self, x: f64, y: f64) -> Option<Beacon> {
        let phase = self.rng.random_range(0.0..TAU);
        self.record.beacons.push(Beacon::new(x, y, phase));
        self.trim_beacons().into_iter().next()
    }

    /// Drop the oldest beacons until the list fits its capacity.
    fn trim_beacons(&mut self) -> Vec<Beacon> {
        let excess = self.record.beacons.len().saturating_sub(self.beacon_capacity);
        self.record.beacons.drain(..excess).collect()
    }

    /// Spawn a burst of particles at a point.
    ///
    /// `strength` scales the random initial velocity of every particle.
    pub fn spawn_bloom(&mut self, x: f64, y: f64, strength: f64) {
        let count = if self.motion.is_reduced() { BLOOM_REDUCED } else { BLOOM_NORMAL };
        let rng = &mut self.rng;
        self.particles.extend((0..count).map(|_| Particle {
            x,
            y,
            vx: rng.random_range(-BLOOM_SPEED..BLOOM_SPEED) * strength,
            vy: rng.random_range(-BLOOM_SPEED..BLOOM_SPEED) * strength,
            age: 0,
            lifetime: rng.random_range(26..=60),
            radius: rng.random_range(1.0..2.8),
        }));
    }

    /// A random point at least `margin` inside the surface
    pub fn random_point(&mut self, margin: f64) -> (f64, f64) {
        let (w, h) = (self.viewport.width, self.viewport.height);
        let pick = |rng: &mut StdRng, extent: f64| {
            if extent > 2.0 * margin {
                rng.random_range(margin..extent - margin)
            } else {
                extent / 2.0
            }
        };
        let x = pick(&mut self.rng, w);
        let y = pick(&mut self.rng, h);
        (x, y)
    }

    /// Random phrase index for the console ticker
    pub fn random_index(&mut self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.rng.random_range(0..len)
        }
    }

    /// Clear beacons and particles and re-seed the stars.
    pub fn reset(&mut self) {
        self.record.beacons.clear();
        self.particles.clear();
        self.seed_stars();
    }

    /// Swap in a new record (after an import) and re-seed the stars.
    pub fn replace_record(&mut self, record: Record) {
        self.record = record;
        self.trim_beacons();
        self.seed_stars();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(motion: Motion) -> Scene {
        Scene::new(Record::default(), Viewport::new(800.0, 600.0, 1.0), motion, Some(42))
    }

    #[test]
    fn test_viewport_clamps_ratio_and_floors() {
        let v = Viewport::new(800.7, 600.2, 3.0);
        assert_eq!(v.width, 800.0);
        assert_eq!(v.height, 600.0);
        assert_eq!(v.dpr, 2.0);
        assert_eq!(v.backing_size(), (1600, 1200));
        assert_eq!(Viewport::new(10.0, 10.0, 0.5).dpr, 1.0);
        assert_eq!(Viewport::new(10.0, 10.0, f64::NAN).dpr, 1.0);
    }

    #[test]
    fn test_star_count_follows_motion() {
        assert_eq!(scene(Motion::Full).stars.len(), 140);
        assert_eq!(scene(Motion::Reduced).stars.len(), 60);
    }

    #[test]
    fn test_stars_inside_surface() {
        let s = scene(Motion::Full);
        for star in &s.stars {
            assert!(star.x >= 0.0 && star.x < 800.0);
            assert!(star.y >= 0.0 && star.y < 600.0);
            assert!(star.radius >= 0.6 && star.radius < 2.0);
            assert!(star.speed >= 0.002 && star.speed < 0.016);
        }
    }

    #[test]
    fn test_resize_reseeds_to_new_area() {
        let mut s = scene(Motion::Full);
        s.resize(Viewport::new(100.0, 50.0, 1.0));
        assert_eq!(s.stars.len(), 140);
        assert!(s.stars.iter().all(|st| st.x < 100.0 && st.y < 50.0));
    }

    #[test]
    fn test_beacon_fifo_eviction() {
        let mut s = scene(Motion::Full).with_beacon_capacity(3);
        for i in 0..3 {
            assert!(s.add_beacon(i as f64, 0.0).is_none());
        }
        let evicted = s.add_beacon(3.0, 0.0).unwrap();
        assert_eq!(evicted.x, 0.0);
        let xs: Vec<f64> = s.record.beacons.iter().map(|b| b.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut s = scene(Motion::Full);
        for i in 0..100 {
            s.add_beacon(i as f64, i as f64);
            assert!(s.record.beacons.len() <= DEFAULT_BEACON_CAPACITY);
        }
        assert_eq!(s.record.beacons.first().unwrap().x, 80.0);
    }

    #[test]
    fn test_loaded_record_is_trimmed() {
        let mut record = Record::default();
        for i in 0..30 {
            record.beacons.push(Beacon::new(i as f64, 0.0, 0.0));
        }
        let s = Scene::new(record, Viewport::default(), Motion::Full, Some(1));
        assert_eq!(s.record.beacons.len(), 20);
        assert_eq!(s.record.beacons[0].x, 10.0);
    }

    #[test]
    fn test_bloom_batch_size_and_speed() {
        let mut s = scene(Motion::Full);
        s.spawn_bloom(10.0, 20.0, 2.0);
        assert_eq!(s.particles.len(), 70);
        for p in &s.particles {
            assert_eq!((p.x, p.y), (10.0, 20.0));
            assert!(p.vx.abs() <= 4.4 && p.vy.abs() <= 4.4);
            assert!((26..=60).contains(&p.lifetime));
            assert_eq!(p.age, 0);
        }

        let mut r = scene(Motion::Reduced);
        r.spawn_bloom(0.0, 0.0, 1.0);
        assert_eq!(r.particles.len(), 30);
    }

    #[test]
    fn test_reset_keeps_mood_and_lists() {
        let mut s = scene(Motion::Full);
        s.record.mood = 0.8;
        s.add_beacon(1.0, 1.0);
        s.spawn_bloom(1.0, 1.0, 1.0);
        s.reset();
        assert!(s.record.beacons.is_empty());
        assert!(s.particles.is_empty());
        assert_eq!(s.record.mood, 0.8);
        assert_eq!(s.stars.len(), 140);
    }

    #[test]
    fn test_random_point_respects_margin() {
        let mut s = scene(Motion::Full);
        for _ in 0..200 {
            let (x, y) = s.random_point(40.0);
            assert!(x >= 40.0 && x < 760.0);
            assert!(y >= 40.0 && y < 560.0);
        }
        s.resize(Viewport::new(50.0, 50.0, 1.0));
        assert_eq!(s.random_point(40.0), (25.0, 25.0));
    }

    #[test]
    fn test_same_seed_same_scene() {
        let a = scene(Motion::Full);
        let b = scene(Motion::Full);
        assert_eq!(a.stars, b.stars);
    }

    #[test]
    fn test_particle_normalized_age() {
        let p = Particle { x: 0.0, y: 0.0, vx: 0.0, vy: 0.0, age: 5, lifetime: 10, radius: 1.0 };
        assert!((p.normalized_age() - 0.5).abs() < 0.001);
        assert!(!p.is_expired());
    }
}
