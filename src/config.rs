//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of internal retries after a concurrency conflict
pub const DEFAULT_CONFLICT_RETRIES: u32 = 1;
/// Default subject line for receipts
pub const DEFAULT_RECEIPT_SUBJECT: &str = "Transaction Receipt";
/// Default upper bound on a listing page
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;
/// Default time a detached receipt delivery may take
pub const DEFAULT_RECEIPT_TIMEOUT_MS: u64 = 10_000;

/// Tunables for the posting engine and listing reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many times a unit of work that hit a concurrency conflict is
    /// replayed before the caller sees a persistence failure
    pub conflict_retries: u32,
    /// Subject line of receipt notifications
    pub receipt_subject: String,
    /// Receipt deliveries still pending after this many milliseconds are abandoned
    pub receipt_timeout_ms: u64,
    /// Page sizes above this are clamped
    pub max_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
            receipt_subject: DEFAULT_RECEIPT_SUBJECT.to_string(),
            receipt_timeout_ms: DEFAULT_RECEIPT_TIMEOUT_MS,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `{prefix}_CONFLICT_RETRIES`: retries after a concurrency conflict
    /// - `{prefix}_RECEIPT_SUBJECT`: receipt subject line
    /// - `{prefix}_RECEIPT_TIMEOUT_MS`: receipt delivery timeout in milliseconds
    /// - `{prefix}_MAX_PAGE_SIZE`: largest listing page
    ///
    /// Missing variables use default values.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            conflict_retries: parse_env(
                &format!("{prefix}_CONFLICT_RETRIES"),
                defaults.conflict_retries,
            )?,
            receipt_subject: read_env(&format!("{prefix}_RECEIPT_SUBJECT"))?
                .unwrap_or(defaults.receipt_subject),
            receipt_timeout_ms: parse_env(
                &format!("{prefix}_RECEIPT_TIMEOUT_MS"),
                defaults.receipt_timeout_ms,
            )?,
            max_page_size: parse_env(&format!("{prefix}_MAX_PAGE_SIZE"), defaults.max_page_size)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.receipt_timeout_ms)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::OutOfRange {
                name: "max_page_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.receipt_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange {
                name: "receipt_timeout_ms".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.receipt_subject.trim().is_empty() {
            return Err(ConfigError::OutOfRange {
                name: "receipt_subject".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {message} (value: {value:?})")]
    InvalidValue {
        name: String,
        message: String,
        value: String,
    },
    #[error("Value out of range for {name}: {message}")]
    OutOfRange { name: String, message: String },
}

fn read_env(name: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(error) => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: error.to_string(),
            value: String::new(),
        }),
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match read_env(name)? {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name: name.to_string(),
                message: e.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.conflict_retries, 1);
        assert_eq!(config.receipt_subject, "Transaction Receipt");
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.receipt_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "conflict_retries": 3 }"#).unwrap();
        assert_eq!(config.conflict_retries, 3);
        assert_eq!(config.max_page_size, DEFAULT_MAX_PAGE_SIZE);
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("POSTING_CFG_TEST_CONFLICT_RETRIES", "2");
        std::env::set_var("POSTING_CFG_TEST_MAX_PAGE_SIZE", "25");
        std::env::set_var("POSTING_CFG_TEST_RECEIPT_TIMEOUT_MS", "250");
        let config = EngineConfig::from_env("POSTING_CFG_TEST").unwrap();
        assert_eq!(config.conflict_retries, 2);
        assert_eq!(config.max_page_size, 25);
        assert_eq!(config.receipt_timeout(), Duration::from_millis(250));
        assert_eq!(config.receipt_subject, DEFAULT_RECEIPT_SUBJECT);

        std::env::set_var("POSTING_CFG_BAD_CONFLICT_RETRIES", "many");
        assert!(matches!(
            EngineConfig::from_env("POSTING_CFG_BAD"),
            Err(ConfigError::InvalidValue { .. })
        ));

        std::env::set_var("POSTING_CFG_ZERO_MAX_PAGE_SIZE", "0");
        assert!(matches!(
            EngineConfig::from_env("POSTING_CFG_ZERO"),
            Err(ConfigError::OutOfRange { .. })
        ));

        std::env::set_var("POSTING_CFG_NOWAIT_RECEIPT_TIMEOUT_MS", "0");
        assert!(matches!(
            EngineConfig::from_env("POSTING_CFG_NOWAIT"),
            Err(ConfigError::OutOfRange { .. })
        ));
    }
}
