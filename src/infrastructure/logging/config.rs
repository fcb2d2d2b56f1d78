use std::path::PathBuf;
use tracing::Level;

use crate::infrastructure::config::ConfigError;
use crate::domain::models::LoggingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl RotationPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "hourly" => Some(Self::Hourly),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

/// Parsed, typed form of [`LoggingConfig`].
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: Level,
    pub format: LogFormat,
    /// Rolling file output in addition to stderr
    pub log_dir: Option<PathBuf>,
    pub rotation: RotationPolicy,
}

impl LogSettings {
    /// Raise the level to at least `level`, for `--verbose`.
    pub fn with_min_level(mut self, level: Level) -> Self {
        // tracing orders levels by verbosity: TRACE > DEBUG > ... > ERROR
        if level > self.level {
            self.level = level;
        }
        self
    }
}

impl TryFrom<&LoggingConfig> for LogSettings {
    type Error = ConfigError;

    fn try_from(config: &LoggingConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            level: parse_log_level(&config.level).ok_or_else(|| ConfigError::InvalidLogLevel(config.level.clone()))?,
            format: LogFormat::parse(&config.format)
                .ok_or_else(|| ConfigError::InvalidLogFormat(config.format.clone()))?,
            log_dir: config.log_dir.as_ref().map(PathBuf::from),
            rotation: RotationPolicy::parse(&config.rotation)
                .ok_or_else(|| ConfigError::InvalidRotation(config.rotation.clone()))?,
        })
    }
}

/// Parse log level string to Level
pub fn parse_log_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_log_level("WARN"), Some(Level::WARN));
        assert_eq!(parse_log_level("verbose"), None);
    }

    #[test]
    fn test_settings_from_config() {
        let config = LoggingConfig {
            level: "info".into(),
            format: "JSON".into(),
            log_dir: Some("/tmp/maestro-logs".into()),
            rotation: "hourly".into(),
        };
        let settings = LogSettings::try_from(&config).unwrap();
        assert_eq!(settings.level, Level::INFO);
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.rotation, RotationPolicy::Hourly);
        assert_eq!(settings.log_dir, Some(PathBuf::from("/tmp/maestro-logs")));
    }

    #[test]
    fn test_with_min_level_only_raises() {
        let settings = LogSettings::try_from(&LoggingConfig::default()).unwrap();
        assert_eq!(settings.clone().with_min_level(Level::DEBUG).level, Level::DEBUG);

        let mut trace = settings;
        trace.level = Level::TRACE;
        assert_eq!(trace.with_min_level(Level::DEBUG).level, Level::TRACE);
    }

    #[test]
    fn test_invalid_format_is_rejected() {
        let config = LoggingConfig { format: "xml".into(), ..Default::default() };
        assert!(matches!(LogSettings::try_from(&config), Err(ConfigError::InvalidLogFormat(_))));
    }
}
