//! The mood machine: one owned context for the whole dashboard
//!
//! [`Machine`] ties the scene, the persisted record, the frame driver, the
//! periodic tasks and the console together and exposes the user actions.
//! Every mutation of the record is followed by a save; save failures become
//! console warnings and never reach the caller.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::automation::{self, Firing};
use crate::color::Theme;
use crate::console::{local_time, Console, Level, PHRASES};
use crate::driver::{Clock, DriverMode, FrameDriver};
use crate::models::{Agent, Automation, AutomationKind, Record, RecordError};
use crate::mood::{self, DriftLabel, MoodLabel};
use crate::render::{self, Frame};
use crate::scene::{Motion, Scene, Viewport, DEFAULT_BEACON_CAPACITY};
use crate::scheduler::Scheduler;
use crate::simulation;
use crate::store::{KvStore, StateStore};

const POINTER_BLOOM: f64 = 0.9;
const BUTTON_BLOOM: f64 = 1.1;
const AUTOMATION_BLOOM: f64 = 1.0;
/// Beacon automations bloom at least this far inside the surface
const AUTOMATION_MARGIN: f64 = 40.0;

/// Where a pointer press landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// The background surface
    Surface,
    /// A control, card, link or input on top of it
    Interface,
}

/// Periodic work registered with the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Console,
    Clock,
    Automations,
}

/// Periods of the periodic tasks, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub console_ms: i64,
    pub console_reduced_ms: i64,
    pub clock_ms: i64,
    pub automation_ms: i64,
}

impl Default for Timers {
    fn default() -> Self {
        Self { console_ms: 2400, console_reduced_ms: 3500, clock_ms: 500, automation_ms: 2500 }
    }
}

/// Construction parameters for a [`Machine`]
#[derive(Debug, Clone)]
pub struct MachineOptions {
    pub viewport: Viewport,
    pub motion: Motion,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
    pub beacon_capacity: usize,
    pub theme: Theme,
    pub timers: Timers,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            motion: Motion::Full,
            seed: None,
            beacon_capacity: DEFAULT_BEACON_CAPACITY,
            theme: Theme::default(),
            timers: Timers::default(),
        }
    }
}

/// The three dashboard indicators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kpis {
    /// Beacon count as shown
    pub beacons: String,
    pub drift: DriftLabel,
    pub mood: MoodLabel,
}

/// Why the host refused a fullscreen change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FullscreenError {
    #[error("fullscreen request denied")]
    Denied,
}

/// The host's fullscreen capability
pub trait FullscreenHost {
    fn is_fullscreen(&self) -> bool;
    fn request_fullscreen(&mut self) -> Result<(), FullscreenError>;
    fn exit_fullscreen(&mut self) -> Result<(), FullscreenError>;
}

/// The dashboard
pub struct Machine<S: KvStore, C: Clock> {
    scene: Scene,
    store: StateStore<S>,
    clock: C,
    theme: Theme,
    driver: FrameDriver,
    scheduler: Scheduler<Task>,
    console: Console,
    clock_label: String,
    started_ms: i64,
    save_failures: u32,
}

impl<S: KvStore, C: Clock> Machine<S, C> {
    /// Load the stored record, seed the scene and register the periodic tasks.
    pub fn new(store: StateStore<S>, clock: C, options: MachineOptions) -> Self {
        let record = store.load();
        let now = clock.now_ms();
        let scene = Scene::new(record, options.viewport, options.motion, options.seed)
            .with_beacon_capacity(options.beacon_capacity);

        let timers = options.timers;
        let console_ms =
            if options.motion.is_reduced() { timers.console_reduced_ms } else { timers.console_ms };
        let mut scheduler = Scheduler::new();
        scheduler.register(Task::Console, console_ms, now);
        scheduler.register(Task::Clock, timers.clock_ms, now);
        scheduler.register(Task::Automations, timers.automation_ms, now);

        let mut machine = Self {
            scene,
            store,
            clock,
            theme: options.theme,
            driver: FrameDriver::new(DriverMode::for_motion(options.motion)),
            scheduler,
            console: Console::new(),
            clock_label: local_time(now, "%H:%M"),
            started_ms: now,
            save_failures: 0,
        };
        machine.log("Boot sequence: good morning.", Level::Ok);
        machine.log("Status: pleasantly sinister.", Level::Info);
        info!(
            beacons = machine.scene.record.beacons.len(),
            agents = machine.scene.record.agents.len(),
            automations = machine.scene.record.automations.len(),
            motion = ?options.motion,
            "machine started"
        );
        machine
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn record(&self) -> &Record {
        &self.scene.record
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn store(&self) -> &StateStore<S> {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn driver(&self) -> &FrameDriver {
        &self.driver
    }

    /// `HH:MM` as last refreshed by the clock ticker
    pub fn clock_label(&self) -> &str {
        &self.clock_label
    }

    /// Saves that failed since start
    pub fn save_failures(&self) -> u32 {
        self.save_failures
    }

    pub fn kpis(&self) -> Kpis {
        let record = &self.scene.record;
        Kpis {
            beacons: record.beacons.len().to_string(),
            drift: DriftLabel::of(record.drift),
            mood: MoodLabel::of(record.mood),
        }
    }

    fn log(&mut self, message: impl Into<String>, level: Level) {
        let now = self.clock.now_ms();
        self.console.push(now, message, level);
    }

    /// Persist the record; failures are logged and swallowed.
    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.scene.record) {
            warn!(key = %self.store.key(), error = %e, "save failed");
            self.save_failures += 1;
            self.log(format!("Save failed: {}", e), Level::Warn);
        }
    }

    /// A pointer press. Only presses on the bare surface at a finite position
    /// drop a beacon.
    ///
    /// Returns whether a beacon was added.
    pub fn pointer_down(&mut self, x: f64, y: f64, target: PointerTarget) -> bool {
        if target == PointerTarget::Interface {
            return false;
        }
        if !x.is_finite() || !y.is_finite() {
            warn!(x, y, "pointer position rejected");
            return false;
        }
        if let Some(evicted) = self.scene.add_beacon(x, y) {
            debug!(x = evicted.x, y = evicted.y, "oldest beacon evicted");
        }
        self.scene.spawn_bloom(x, y, POINTER_BLOOM);
        self.log(format!("Beacon dropped @ {},{}", x.round(), y.round()), Level::Ok);
        self.persist();
        true
    }

    pub fn bloom(&mut self) {
        mood::lift(&mut self.scene.record);
        let (w, h) = (self.scene.viewport.width, self.scene.viewport.height);
        self.scene.spawn_bloom(w * 0.5, h * 0.38, BUTTON_BLOOM);
        self.log("Bloom triggered. Reality slightly improved.", Level::Ok);
        self.persist();
    }

    pub fn calm(&mut self) {
        mood::settle(&mut self.scene.record);
        self.log("Calm mode engaged. Panic postponed.", Level::Info);
        self.persist();
    }

    /// Clear beacons and particles. Mood, drift, agents and automations stay.
    pub fn reset(&mut self) {
        self.scene.reset();
        self.log("Reset. Fresh slate. Same universe.", Level::Warn);
        self.persist();
    }

    /// Append an agent. Blank names are ignored.
    pub fn add_agent(&mut self, name: &str, role: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let id = self.clock.now_ms();
        self.scene.record.agents.push(Agent { name: name.to_string(), role: role.to_string(), id });
        self.persist();
        self.log(format!("Agent {} created.", name), Level::Ok);
        true
    }

    /// Remove the agent at `index`; out-of-range indices are ignored.
    pub fn remove_agent(&mut self, index: usize) -> Option<Agent> {
        if index >= self.scene.record.agents.len() {
            return None;
        }
        let removed = self.scene.record.agents.remove(index);
        self.persist();
        self.log(format!("Agent {} removed.", removed.name), Level::Warn);
        Some(removed)
    }

    /// Append an automation. Blank names are ignored.
    pub fn add_automation(&mut self, name: &str, kind: AutomationKind, data: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let id = self.clock.now_ms();
        self.scene.record.automations.push(Automation {
            name: name.to_string(),
            kind,
            data: data.to_string(),
            id,
            last_fired: None,
        });
        self.persist();
        self.log(format!("Automation {} created.", name), Level::Ok);
        true
    }

    /// Remove the automation at `index`; out-of-range indices are ignored.
    pub fn remove_automation(&mut self, index: usize) -> Option<Automation> {
        if index >= self.scene.record.automations.len() {
            return None;
        }
        let removed = self.scene.record.automations.remove(index);
        self.persist();
        self.log(format!("Automation {} removed.", removed.name), Level::Warn);
        Some(removed)
    }

    /// Replace the whole record with an imported document.
    ///
    /// A malformed document leaves the current state untouched and logs a
    /// warning; the error is returned for callers that want to show it.
    pub fn import(&mut self, text: &str) -> Result<(), RecordError> {
        match Record::from_json_strict(text) {
            Ok(record) => {
                self.scene.replace_record(record);
                self.persist();
                self.log("State imported.", Level::Ok);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "import rejected");
                self.log("Import failed.", Level::Warn);
                Err(e)
            }
        }
    }

    /// The record as two-space indented JSON
    pub fn export(&mut self) -> Result<String, serde_json::Error> {
        let text = self.scene.record.to_pretty_json()?;
        self.log("State exported.", Level::Ok);
        Ok(text)
    }

    /// New surface size; the star field is re-seeded to cover it.
    pub fn resize(&mut self, viewport: Viewport) {
        self.scene.resize(viewport);
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.driver.set_visible(visible);
    }

    /// Advance and render for the current clock time, if the driver is due.
    ///
    /// Frame timestamps count from machine start.
    pub fn frame(&mut self) -> Option<Frame> {
        let elapsed = (self.clock.now_ms() - self.started_ms) as f64;
        self.driver.frame(&mut self.scene, &self.theme, elapsed)
    }

    /// Advance `ticks` fixed steps and render at `timestamp_ms`, outside the
    /// frame driver's pacing.
    pub fn step(&mut self, ticks: u32, timestamp_ms: f64) -> Frame {
        for _ in 0..ticks {
            simulation::tick(&mut self.scene);
        }
        render::render(&self.scene, &self.theme, timestamp_ms)
    }

    /// Run every periodic task that is due; returns the tasks that ran.
    pub fn pump(&mut self) -> Vec<Task> {
        let now = self.clock.now_ms();
        let due = self.scheduler.due(now);
        for task in &due {
            match task {
                Task::Console => self.tick_console(),
                Task::Clock => self.clock_label = local_time(now, "%H:%M"),
                Task::Automations => {
                    self.run_automations(now);
                }
            }
        }
        due
    }

    fn tick_console(&mut self) {
        let (message, level) = PHRASES[self.scene.random_index(PHRASES.len())];
        self.log(message, level);
    }

    /// One automation sweep at `now_ms`. The record is saved afterwards
    /// whether or not anything fired.
    pub fn run_automations(&mut self, now_ms: i64) -> Vec<Firing> {
        let beacons = self.scene.record.beacons.len();
        let fired = automation::evaluate(&mut self.scene.record.automations, beacons, now_ms);
        for firing in &fired {
            let (x, y) = match firing.kind {
                AutomationKind::Beacon => self.scene.random_point(AUTOMATION_MARGIN),
                _ => (self.scene.viewport.width * 0.5, self.scene.viewport.height * 0.5),
            };
            self.log(firing.message(), Level::Ok);
            self.scene.spawn_bloom(x, y, AUTOMATION_BLOOM);
        }
        self.persist();
        fired
    }

    /// Enter or leave fullscreen through the host.
    ///
    /// Returns the new fullscreen state. A refusal is logged and nothing
    /// changes.
    pub fn toggle_fullscreen(
        &mut self,
        host: &mut dyn FullscreenHost,
    ) -> Result<bool, FullscreenError> {
        let entering = !host.is_fullscreen();
        let result = if entering { host.request_fullscreen() } else { host.exit_fullscreen() };
        match result {
            Ok(()) if entering => {
                self.log("Fullscreen engaged. No distractions.", Level::Ok);
                Ok(true)
            }
            Ok(()) => {
                self.log("Fullscreen exited. Back to reality.", Level::Info);
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "fullscreen toggle refused");
                self.log("Fullscreen blocked. Press F11 like it’s 2009.", Level::Warn);
                Err(e)
            }
        }
    }
}
