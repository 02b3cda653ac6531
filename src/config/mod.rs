//! Configuration module for autocon.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - CLI argument parsing and merging
//! - Configuration validation

pub mod loader;
pub mod validation;

pub use loader::{Config, LibraryConfig, SyncConfig, DEFAULT_ITEM_LIMIT, DEFAULT_ROOT};
pub use validation::validate_config;
