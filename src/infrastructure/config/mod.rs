//! Configuration management
//!
//! Hierarchical configuration using figment: defaults, project YAML files,
//! then `MAESTRO_*` environment overrides.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader, ENV_PREFIX, PROJECT_DIR};
