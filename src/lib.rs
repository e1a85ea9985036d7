//! Clawdbot - a headless mood machine dashboard
//!
//! This library provides functionality to:
//! - Persist a small dashboard record (beacons, mood, agents, automations)
//! - Simulate and render the animated beacon/particle background
//! - Drive frames and periodic tasks from an explicit clock
//! - Browse an exam document and keep answers locally

pub mod app;
pub mod automation;
pub mod cli;
pub mod color;
pub mod config;
pub mod console;
pub mod driver;
pub mod exam;
pub mod gif;
pub mod logging;
pub mod models;
pub mod mood;
pub mod output;
pub mod raster;
pub mod render;
pub mod scene;
pub mod scheduler;
pub mod simulation;
pub mod store;

#[cfg(feature = "wasm")]
pub mod wasm;
