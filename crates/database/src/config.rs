//! Database configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How long committed entries stay in the event log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogRetention {
    /// Keep every entry. Required for replay.
    #[default]
    KeepAll,
    /// Drop entries once every registered effect adapter has acknowledged them.
    UntilAcknowledged,
}

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Name used in log output.
    #[serde(default = "default_name")]
    pub name: String,

    /// Number of compiled descriptors kept by `Database::compile`. Zero disables caching.
    #[serde(default = "default_descriptor_cache_capacity")]
    pub descriptor_cache_capacity: usize,

    /// Event-log retention policy.
    #[serde(default)]
    pub log_retention: LogRetention,

    /// Catch and log listener panics instead of unwinding into the mutation caller.
    #[serde(default = "default_isolate_listener_panics")]
    pub isolate_listener_panics: bool,

    /// Redelivery attempts for a failing effect hook before the entry is skipped.
    #[serde(default = "default_hook_retries")]
    pub hook_retries: u32,
}

fn default_name() -> String {
    "rivulet".to_string()
}

fn default_descriptor_cache_capacity() -> usize {
    64
}

fn default_isolate_listener_panics() -> bool {
    true
}

fn default_hook_retries() -> u32 {
    3
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            descriptor_cache_capacity: default_descriptor_cache_capacity(),
            log_retention: LogRetention::default(),
            isolate_listener_panics: default_isolate_listener_panics(),
            hook_retries: default_hook_retries(),
        }
    }
}

impl DatabaseConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_log_retention(mut self, retention: LogRetention) -> Self {
        self.log_retention = retention;
        self
    }

    pub fn with_descriptor_cache_capacity(mut self, capacity: usize) -> Self {
        self.descriptor_cache_capacity = capacity;
        self
    }

    pub fn with_listener_panic_isolation(mut self, isolate: bool) -> Self {
        self.isolate_listener_panics = isolate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DatabaseConfig::default();
        assert_eq!(config.name, "rivulet");
        assert_eq!(config.descriptor_cache_capacity, 64);
        assert_eq!(config.log_retention, LogRetention::KeepAll);
        assert!(config.isolate_listener_panics);
        assert_eq!(config.hook_retries, 3);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config =
            DatabaseConfig::from_json(r#"{"name": "app", "log_retention": "until_acknowledged"}"#)
                .unwrap();
        assert_eq!(config.name, "app");
        assert_eq!(config.log_retention, LogRetention::UntilAcknowledged);
        assert_eq!(config.descriptor_cache_capacity, 64);
        assert!(config.isolate_listener_panics);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = DatabaseConfig::new()
            .with_name("x")
            .with_descriptor_cache_capacity(0)
            .with_listener_panic_isolation(false);
        let parsed = DatabaseConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_json() {
        assert!(DatabaseConfig::from_json(r#"{"log_retention": "forever"}"#).is_err());
    }
}
