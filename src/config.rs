// ⚙️ Configuration - loaded from a JSON file, every field has a default

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_QUEUE_KEY: &str = "offline_action_queue";

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_queue_key() -> String {
    DEFAULT_QUEUE_KEY.to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("ledger-sync.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// QUEUE CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Failed attempts after which an action is quarantined
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Store slot holding the serialized queue
    #[serde(default = "default_queue_key")]
    pub queue_key: String,

    /// Per-handler deadline; a timeout counts as a failed attempt
    #[serde(default)]
    pub handler_timeout_ms: Option<u64>,
}

impl QueueConfig {
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            max_retries: default_max_retries(),
            queue_key: default_queue_key(),
            handler_timeout_ms: None,
        }
    }
}

// ============================================================================
// APP CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// tracing filter directive, e.g. "info" or "ledger_sync=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub queue: QueueConfig,
}

impl AppConfig {
    /// Load config from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: default_database_path(),
            log_level: default_log_level(),
            queue: QueueConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.queue.max_retries, 3);
        assert_eq!(config.queue.queue_key, "offline_action_queue");
        assert_eq!(config.queue.handler_timeout(), None);
    }

    #[test]
    fn test_partial_queue_section() {
        let config: AppConfig =
            serde_json::from_str(r#"{"queue": {"max_retries": 5, "handler_timeout_ms": 2500}}"#).unwrap();
        assert_eq!(config.queue.max_retries, 5);
        assert_eq!(config.queue.queue_key, DEFAULT_QUEUE_KEY);
        assert_eq!(config.queue.handler_timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_from_file_missing() {
        let err = AppConfig::from_file("/nonexistent/ledger-sync.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
