//! Configuration schema types for `claw.toml`
//!
//! Every section is optional; a missing key takes the same default the
//! machine would use without any configuration.

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::app::{MachineOptions, Timers};
use crate::color::{parse_color, ColorError, Theme};
use crate::exam::ANSWERS_KEY;
use crate::scene::{Motion, Viewport, DEFAULT_BEACON_CAPACITY};
use crate::store::STATE_KEY;

/// Where state is kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the key-value store; relative paths resolve against the
    /// directory holding `claw.toml`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Slot of the dashboard record
    #[serde(default = "default_state_key")]
    pub key: String,
    /// Slot of the exam answer sheet
    #[serde(default = "default_answers_key")]
    pub answers_key: String,
}

fn default_state_key() -> String {
    STATE_KEY.to_string()
}

fn default_answers_key() -> String {
    ANSWERS_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { dir: None, key: default_state_key(), answers_key: default_answers_key() }
    }
}

/// The drawing surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_dpr")]
    pub device_pixel_ratio: f64,
    #[serde(default)]
    pub reduced_motion: bool,
    /// Page colour behind the canvas in rendered images
    #[serde(default = "default_background")]
    pub background: String,
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_dpr() -> f64 {
    1.0
}

fn default_background() -> String {
    "#05070d".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            device_pixel_ratio: default_dpr(),
            reduced_motion: false,
            background: default_background(),
        }
    }
}

/// Simulation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Fixed random seed; unset means a fresh seed per run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default = "default_beacon_capacity")]
    pub beacon_capacity: usize,
}

fn default_beacon_capacity() -> usize {
    DEFAULT_BEACON_CAPACITY
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { seed: None, beacon_capacity: default_beacon_capacity() }
    }
}

/// Renderer colours, as CSS colour strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "default_ice")]
    pub halo_low: String,
    #[serde(default = "default_mint")]
    pub halo_high: String,
    #[serde(default = "default_ice")]
    pub link: String,
    #[serde(default = "default_mint")]
    pub particle: String,
}

fn default_ice() -> String {
    "#3dfcff".to_string()
}

fn default_mint() -> String {
    "#5bffb0".to_string()
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            halo_low: default_ice(),
            halo_high: default_mint(),
            link: default_ice(),
            particle: default_mint(),
        }
    }
}

/// Periodic task intervals in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimersConfig {
    #[serde(default = "default_console_ms")]
    pub console_ms: u32,
    #[serde(default = "default_console_reduced_ms")]
    pub console_reduced_ms: u32,
    #[serde(default = "default_clock_ms")]
    pub clock_ms: u32,
    #[serde(default = "default_automation_ms")]
    pub automation_ms: u32,
}

fn default_console_ms() -> u32 {
    2400
}

fn default_console_reduced_ms() -> u32 {
    3500
}

fn default_clock_ms() -> u32 {
    500
}

fn default_automation_ms() -> u32 {
    2500
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            console_ms: default_console_ms(),
            console_reduced_ms: default_console_reduced_ms(),
            clock_ms: default_clock_ms(),
            automation_ms: default_automation_ms(),
        }
    }
}

/// Complete claw.toml configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClawConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub timers: TimersConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "display.width")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "claw.toml: '{}' {}", self.field, self.message)
    }
}

impl ClawConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut invalid = |field: &str, message: String| {
            errors.push(ConfigValidationError { field: field.to_string(), message });
        };

        if self.storage.key.trim().is_empty() {
            invalid("storage.key", "must be a non-empty string".to_string());
        }
        if self.storage.answers_key.trim().is_empty() {
            invalid("storage.answers_key", "must be a non-empty string".to_string());
        }

        if self.display.width == 0 {
            invalid("display.width", "must be a positive integer".to_string());
        }
        if self.display.height == 0 {
            invalid("display.height", "must be a positive integer".to_string());
        }
        let dpr = self.display.device_pixel_ratio;
        if !dpr.is_finite() || dpr <= 0.0 {
            invalid("display.device_pixel_ratio", "must be a positive number".to_string());
        }
        if let Err(e) = parse_color(&self.display.background) {
            invalid("display.background", format!("is not a colour: {}", e));
        }

        if self.simulation.beacon_capacity == 0 {
            invalid("simulation.beacon_capacity", "must be a positive integer".to_string());
        }

        for (field, value) in [
            ("theme.halo_low", &self.theme.halo_low),
            ("theme.halo_high", &self.theme.halo_high),
            ("theme.link", &self.theme.link),
            ("theme.particle", &self.theme.particle),
        ] {
            if let Err(e) = parse_color(value) {
                invalid(field, format!("is not a colour: {}", e));
            }
        }

        for (field, value) in [
            ("timers.console_ms", self.timers.console_ms),
            ("timers.console_reduced_ms", self.timers.console_reduced_ms),
            ("timers.clock_ms", self.timers.clock_ms),
            ("timers.automation_ms", self.timers.automation_ms),
        ] {
            if value == 0 {
                invalid(field, "must be a positive number of milliseconds".to_string());
            }
        }

        errors
    }

    pub fn theme(&self) -> Result<Theme, ColorError> {
        Ok(Theme {
            halo_low: parse_color(&self.theme.halo_low)?,
            halo_high: parse_color(&self.theme.halo_high)?,
            link: parse_color(&self.theme.link)?,
            particle: parse_color(&self.theme.particle)?,
        })
    }

    pub fn background(&self) -> Result<Rgba<u8>, ColorError> {
        parse_color(&self.display.background)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(
            self.display.width as f64,
            self.display.height as f64,
            self.display.device_pixel_ratio,
        )
    }

    pub fn motion(&self) -> Motion {
        Motion::from_reduced(self.display.reduced_motion)
    }

    pub fn timers(&self) -> Timers {
        Timers {
            console_ms: self.timers.console_ms as i64,
            console_reduced_ms: self.timers.console_reduced_ms as i64,
            clock_ms: self.timers.clock_ms as i64,
            automation_ms: self.timers.automation_ms as i64,
        }
    }

    /// Everything a [`crate::app::Machine`] needs from the configuration
    pub fn machine_options(&self) -> Result<MachineOptions, ColorError> {
        Ok(MachineOptions {
            viewport: self.viewport(),
            motion: self.motion(),
            seed: self.simulation.seed,
            beacon_capacity: self.simulation.beacon_capacity,
            theme: self.theme()?,
            timers: self.timers(),
        })
    }
}
