//! Configuration loading and discovery for `claw.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::ClawConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File name searched for
pub const CONFIG_FILE: &str = "claw.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse claw.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// A loaded configuration and the file it came from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadedConfig {
    pub config: ClawConfig,
    /// `None` when built from defaults
    pub path: Option<PathBuf>,
}

impl LoadedConfig {
    /// Store directory: explicit, else relative to the config file, else the
    /// per-user data directory.
    pub fn store_dir(&self) -> PathBuf {
        match (&self.config.storage.dir, &self.path) {
            (Some(dir), Some(path)) => match project_root(path) {
                Some(root) => resolve_path(root, dir),
                None => dir.clone(),
            },
            (Some(dir), None) => dir.clone(),
            (None, _) => default_store_dir(),
        }
    }
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override store directory
    pub store: Option<PathBuf>,
    /// Force reduced motion on
    pub reduced_motion: Option<bool>,
    /// Override random seed
    pub seed: Option<u64>,
}

/// Find claw.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for claw.toml
/// 2. Check XDG_CONFIG_HOME/clawdbot/claw.toml (or ~/.config/clawdbot/claw.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

fn xdg_dir(var: &str, fallback: &str) -> Option<PathBuf> {
    env::var(var)
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(fallback)))
        .ok()
}

/// Find claw.toml in XDG config directory.
///
/// Checks XDG_CONFIG_HOME/clawdbot/claw.toml or ~/.config/clawdbot/claw.toml
pub fn find_xdg_config() -> Option<PathBuf> {
    let config_path = xdg_dir("XDG_CONFIG_HOME", ".config")?.join("clawdbot").join(CONFIG_FILE);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find claw.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Per-user store directory: XDG_DATA_HOME/clawdbot (or
/// ~/.local/share/clawdbot), falling back to `.clawdbot` in the working
/// directory.
pub fn default_store_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
        .map(|d| d.join("clawdbot"))
        .unwrap_or_else(|| PathBuf::from(".clawdbot"))
}

/// Load configuration from a claw.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            let config = load_config_file(&p)?;
            debug!(path = %p.display(), "configuration loaded");
            Ok(LoadedConfig { config, path: Some(p) })
        }
        None => Ok(LoadedConfig { config: default_config(), path: None }),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<ClawConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: ClawConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Configuration used when no claw.toml is found
pub fn default_config() -> ClawConfig {
    ClawConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut ClawConfig, overrides: &CliOverrides) {
    if let Some(ref store) = overrides.store {
        config.storage.dir = Some(store.clone());
    }

    if let Some(reduced) = overrides.reduced_motion {
        config.display.reduced_motion = reduced;
    }

    if let Some(seed) = overrides.seed {
        config.simulation.seed = Some(seed);
    }
}

/// Get the project root directory from a config file path.
///
/// Returns the parent directory of the claw.toml file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}
