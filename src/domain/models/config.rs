use serde::{Deserialize, Serialize};

use super::agent::MAESTRO_AGENT_ID;

/// Main configuration structure for Maestro
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Planner (Maestro agent) configuration
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Plan execution configuration
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Generation provider configuration
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".maestro/maestro.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Log file rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Planner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlannerConfig {
    /// Agent id of the plan-drafting agent
    #[serde(default = "default_maestro_agent_id")]
    pub maestro_agent_id: String,

    /// Conversation turns forwarded in chat mode
    #[serde(default = "default_chat_history_turns")]
    pub chat_history_turns: usize,
}

fn default_maestro_agent_id() -> String {
    MAESTRO_AGENT_ID.to_string()
}

const fn default_chat_history_turns() -> usize {
    5
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            maestro_agent_id: default_maestro_agent_id(),
            chat_history_turns: default_chat_history_turns(),
        }
    }
}

/// Plan execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutionConfig {
    /// Per-step generation timeout in seconds (0 disables)
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,

    /// Maximum characters of a worker result kept on a step
    #[serde(default = "default_result_max_chars")]
    pub result_max_chars: usize,
}

const fn default_step_timeout_secs() -> u64 {
    300
}

const fn default_result_max_chars() -> usize {
    4000
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: default_step_timeout_secs(),
            result_max_chars: default_result_max_chars(),
        }
    }
}

/// Generation provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: GeminiProviderConfig,

    #[serde(default)]
    pub generic_rest: GenericRestProviderConfig,
}

/// Google Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GeminiProviderConfig {
    /// API key; falls back to `GEMINI_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

const fn default_http_timeout_secs() -> u64 {
    120
}

impl Default for GeminiProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Generic REST provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenericRestProviderConfig {
    /// HTTP request timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenericRestProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout_secs(),
        }
    }
}
