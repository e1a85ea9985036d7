//! Configuration for the mood machine
//!
//! Provides types, discovery and parsing for `claw.toml`.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
