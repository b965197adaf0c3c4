//! # Resilience Configuration
//!
//! Tunables for queues, recovery and notifications. Defaults are overlaid by
//! an optional file (TOML, YAML or JSON, picked by extension) and then by
//! `RESILIENCE_*` environment variables, e.g.
//! `RESILIENCE_PRIMARY_QUEUE_CONCURRENCY=16`.

use crate::constants::{
    env, DEFAULT_DOWNLOAD_LIMIT, DEFAULT_NOTIFICATION_CAPACITY, DEFAULT_PRIMARY_CONCURRENCY,
    REPLICA_NAME_SUFFIX,
};
use crate::orchestration::RecoverySettings;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Operations the primary queue runs at once
    pub primary_queue_concurrency: usize,
    /// Limit given to a download replica whose source had no limit
    pub default_download_limit: usize,
    /// Split batch writes on `BatchFailure` / `PartialFailure`, not only `LimitExceeded`
    pub split_on_batch_failure: bool,
    /// Appended to a replica's name
    pub replica_name_suffix: String,
    /// Buffer of the broadcaster's async notification channel
    pub notification_channel_capacity: usize,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            primary_queue_concurrency: DEFAULT_PRIMARY_CONCURRENCY,
            default_download_limit: DEFAULT_DOWNLOAD_LIMIT,
            split_on_batch_failure: true,
            replica_name_suffix: REPLICA_NAME_SUFFIX.to_string(),
            notification_channel_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }
}

impl ResilienceConfig {
    /// Defaults overlaid by `RESILIENCE_*` environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let config: Self = Config::builder()
            .add_source(Self::environment())
            .build()?
            .try_deserialize()?;
        config.validate()?;
        debug!(config = ?config, "Configuration loaded from environment");
        Ok(config)
    }

    /// Defaults overlaid by `path`, then by `RESILIENCE_*` environment variables
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let config: Self = Config::builder()
            .add_source(File::from(path))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()?;
        config.validate()?;
        debug!(path = %path.display(), config = ?config, "Configuration loaded from file");
        Ok(config)
    }

    fn environment() -> Environment {
        Environment::with_prefix(env::CONFIG_PREFIX)
            .prefix_separator("_")
            .try_parsing(true)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.primary_queue_concurrency == 0 {
            return Err(ConfigurationError::Invalid {
                field: "primary_queue_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.default_download_limit == 0 {
            return Err(ConfigurationError::Invalid {
                field: "default_download_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.notification_channel_capacity == 0 {
            return Err(ConfigurationError::Invalid {
                field: "notification_channel_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.replica_name_suffix.is_empty() {
            return Err(ConfigurationError::Invalid {
                field: "replica_name_suffix",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn recovery_settings(&self) -> RecoverySettings {
        RecoverySettings {
            default_download_limit: self.default_download_limit,
            split_on_batch_failure: self.split_on_batch_failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ResilienceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_download_limit, 20);
        assert_eq!(config.replica_name_suffix, "+");
        assert!(config.split_on_batch_failure);
    }

    #[test]
    fn test_validation_rejects_zero_and_empty() {
        let config = ResilienceConfig {
            primary_queue_concurrency: 0,
            ..ResilienceConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::Invalid { field: "primary_queue_concurrency", .. })
        ));

        let config = ResilienceConfig {
            replica_name_suffix: String::new(),
            ..ResilienceConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::Invalid { field: "replica_name_suffix", .. })
        ));
    }

    #[test]
    fn test_recovery_settings_follow_config() {
        let config = ResilienceConfig {
            default_download_limit: 50,
            split_on_batch_failure: false,
            ..ResilienceConfig::default()
        };
        let settings = config.recovery_settings();
        assert_eq!(settings.default_download_limit, 50);
        assert!(!settings.split_on_batch_failure);
    }
}
