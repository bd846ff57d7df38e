//! Shared types and configuration for the heightfield viewer.
//!
//! # Invariants
//! - Every config struct deserializes from a partial document; missing fields
//!   fall back to their defaults.

pub mod config;
mod types;

pub use config::{CameraConfig, ConfigError, ViewerConfig, WindowConfig};
pub use types::TerrainParams;
