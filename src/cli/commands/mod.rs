//! CLI command implementations.

pub mod agent;
pub mod chat;
pub mod init;
pub mod plan;
pub mod records;
