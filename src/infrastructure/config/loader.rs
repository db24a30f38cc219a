//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Database URL cannot be empty")]
    EmptyDatabaseUrl,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid request_timeout_secs: {0}. Must be positive")]
    InvalidRequestTimeout(u64),

    #[error("Invalid inheritance cache capacity: {0}. Must be at least 1")]
    InvalidCacheCapacity(usize),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid delegation_max_attempts: {0}. Cannot be 0")]
    InvalidDelegationAttempts(u32),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .taskhub/config.yaml (project config)
    /// 3. .taskhub/local.yaml (local overrides, optional)
    /// 4. Environment variables (TASKHUB_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".taskhub/config.yaml"))
            .merge(Yaml::file(".taskhub/local.yaml"))
            .merge(Env::prefixed("TASKHUB_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("TASKHUB_").split("__"))
            .extract()
            .context(format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.url.is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidRequestTimeout(config.server.request_timeout_secs));
        }
        if config.cache.inheritance_capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity(config.cache.inheritance_capacity));
        }
        if config.limits.burst_size == 0 {
            return Err(ConfigError::InvalidBurstSize(config.limits.burst_size));
        }
        if config.limits.delegation_max_attempts == 0 {
            return Err(ConfigError::InvalidDelegationAttempts(config.limits.delegation_max_attempts));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn empty_database_url_is_rejected() {
        let mut config = Config::default();
        config.database.url = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyDatabaseUrl)
        ));
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn env_overrides_take_precedence() {
        temp_env::with_vars(
            [
                ("TASKHUB_SERVER__PORT", Some("9123")),
                ("TASKHUB_DATABASE__URL", Some("sqlite:/tmp/env-test.db")),
            ],
            || {
                let config = ConfigLoader::load().unwrap();
                assert_eq!(config.server.port, 9123);
                assert_eq!(config.database.url, "sqlite:/tmp/env-test.db");
            },
        );
    }
}
