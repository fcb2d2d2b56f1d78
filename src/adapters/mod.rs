//! Infrastructure adapters for external systems.

pub mod generation;
pub mod memory;
pub mod sqlite;
