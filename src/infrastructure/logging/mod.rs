//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber, with optional
//! rolling JSON files and secret scrubbing for text that leaves the process.

pub mod config;
pub mod logger;
pub mod secret_scrubbing;

pub use config::{parse_log_level, LogFormat, LogSettings, RotationPolicy};
pub use logger::LoggerImpl;
pub use secret_scrubbing::{scrub_secrets, SecretScrubber};
