use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project directory holding the database and configuration files.
pub const PROJECT_DIR: &str = ".maestro";

/// Prefix for environment overrides, e.g. `MAESTRO_EXECUTION__STEP_TIMEOUT_SECS`.
pub const ENV_PREFIX: &str = "MAESTRO_";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_LOG_FORMATS: [&str; 2] = ["json", "pretty"];
const VALID_ROTATIONS: [&str; 3] = ["daily", "hourly", "never"];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Planner agent id cannot be empty")]
    EmptyMaestroAgentId,

    #[error("Invalid result_max_chars: {0}. Must be at least 1")]
    InvalidResultMaxChars(usize),

    #[error("Invalid {provider} timeout_secs: 0. Must be at least 1")]
    InvalidProviderTimeout { provider: &'static str },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `.maestro/config.yaml` (written by `maestro init`)
    /// 3. `.maestro/local.yaml` (optional local overrides)
    /// 4. `MAESTRO_*` environment variables, `__` separating nested keys
    pub fn load() -> Result<Config> {
        Self::load_in(Path::new("."))
    }

    /// Load configuration rooted at `project_root`.
    pub fn load_in(project_root: &Path) -> Result<Config> {
        let dir = project_root.join(PROJECT_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let logging = &config.logging;
        if !VALID_LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(logging.level.clone()));
        }
        if !VALID_LOG_FORMATS.contains(&logging.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(logging.format.clone()));
        }
        if !VALID_ROTATIONS.contains(&logging.rotation.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidRotation(logging.rotation.clone()));
        }

        if config.planner.maestro_agent_id.trim().is_empty() {
            return Err(ConfigError::EmptyMaestroAgentId);
        }
        if config.execution.result_max_chars == 0 {
            return Err(ConfigError::InvalidResultMaxChars(0));
        }

        if config.providers.gemini.timeout_secs == 0 {
            return Err(ConfigError::InvalidProviderTimeout { provider: "gemini" });
        }
        if config.providers.generic_rest.timeout_secs == 0 {
            return Err(ConfigError::InvalidProviderTimeout { provider: "generic_rest" });
        }
        if config.providers.gemini.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "providers.gemini.base_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, ".maestro/maestro.db");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.execution.step_timeout_secs, 300);
        assert_eq!(config.planner.maestro_agent_id, "predef_maestro_orchestrator");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
database:
  path: /custom/path.db
logging:
  level: debug
  format: json
execution:
  step_timeout_secs: 0
providers:
  gemini:
    api_key: from-file
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.database.path, "/custom/path.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.execution.step_timeout_secs, 0);
        assert_eq!(config.execution.result_max_chars, 4000);
        assert_eq!(config.providers.gemini.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.providers.gemini.base_url, "https://generativelanguage.googleapis.com");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "loud"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_rotation() {
        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidRotation(_))));
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::EmptyDatabasePath)));
    }

    #[test]
    fn test_validate_zero_provider_timeout() {
        let mut config = Config::default();
        config.providers.generic_rest.timeout_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidProviderTimeout { provider: "generic_rest" })
        ));
    }

    #[test]
    fn test_hierarchical_merging_and_env_override() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(PROJECT_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.yaml"),
            "logging:\n  level: info\n  format: json\nexecution:\n  step_timeout_secs: 60\n",
        )
        .unwrap();
        fs::write(dir.join("local.yaml"), "logging:\n  level: debug\n").unwrap();

        temp_env::with_vars(
            [
                ("MAESTRO_EXECUTION__STEP_TIMEOUT_SECS", Some("90")),
                ("MAESTRO_LOGGING__LEVEL", None::<&str>),
            ],
            || {
                let config = ConfigLoader::load_in(root.path()).unwrap();
                assert_eq!(config.logging.level, "debug", "local.yaml should win over config.yaml");
                assert_eq!(config.logging.format, "json", "base value should persist");
                assert_eq!(config.execution.step_timeout_secs, 90, "environment should win");
            },
        );
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "logging:\n  format: xml\n").unwrap();
        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }
}
