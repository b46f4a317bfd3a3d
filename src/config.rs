//! Configuration System
//!
//! Hierarchical configuration loading from:
//! - graphflow.toml (default configuration)
//! - graphflow.local.toml (git-ignored local overrides)
//! - Environment variables (GRAPHFLOW_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # graphflow.toml
//! [execution]
//! timeout_ms = 30000
//! accept_partial_success = true
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! GRAPHFLOW_EXECUTION__TIMEOUT_MS=60000
//! GRAPHFLOW_LOGGING__LEVEL=debug
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Per-query execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Query timeout in milliseconds (0 = no timeout)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether rows from partially failed storage reads are kept
    #[serde(default)]
    pub accept_partial_success: bool,

    /// Cap on the bytes of values held per query (0 = unlimited)
    #[serde(default)]
    pub memory_limit_bytes: usize,

    /// Worker threads for the task runner (0 = all available cores)
    #[serde(default)]
    pub worker_threads: usize,

    /// Whether filters preserve row order by default
    #[serde(default = "default_true")]
    pub stable_filter_default: bool,
}

/// Logging configuration, consumed by the embedding service shell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_timeout_ms() -> u64 {
    60_000
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            timeout_ms: default_timeout_ms(),
            accept_partial_success: false,
            memory_limit_bytes: 0,
            worker_threads: 0,
            stable_filter_default: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Merges in order:
    /// 1. graphflow.toml (base configuration)
    /// 2. graphflow.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (GRAPHFLOW_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("graphflow.toml"))
            .merge(Toml::file("graphflow.local.toml"))
            .merge(Env::prefixed("GRAPHFLOW_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("GRAPHFLOW_").split("__"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.execution.timeout_ms, 60_000);
        assert!(!config.execution.accept_partial_success);
        assert_eq!(config.execution.memory_limit_bytes, 0);
        assert!(config.execution.stable_filter_default);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[execution]"));
        assert!(toml_str.contains("[logging]"));
    }
}
