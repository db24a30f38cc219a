//! Server configuration model.
//!
//! Loaded through figment with hierarchical merging (defaults, project yaml,
//! local overrides, `TASKHUB_*` environment variables).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
    /// Per-tool enable flags; tools absent from the map are enabled.
    pub tools: HashMap<String, bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            cache: CacheConfig::default(),
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
            tools: HashMap::new(),
        }
    }
}

impl Config {
    pub fn tool_enabled(&self, name: &str) -> bool {
        self.tools.get(name).copied().unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Bound on waiting for a pooled connection.
    pub acquire_timeout_secs: u64,
    /// Bound on waiting for SQLite's write lock.
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:.taskhub/taskhub.db".to_string(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 3,
            busy_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_payload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
            request_timeout_secs: 30,
            max_payload_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Expected issuer of platform OIDC tokens.
    pub platform_issuer: String,
    /// JWKS endpoint for platform token signature checks.
    pub jwks_url: String,
    /// Extra audience accepted alongside the platform default
    /// `authenticated`.
    pub audience: Option<String>,
    /// HS256 secret for locally issued API tokens.
    pub api_token_secret: String,
    /// Allowed clock skew when validating `exp` / `nbf`.
    pub clock_skew_secs: u64,
    /// How long fetched JWKS keys stay fresh.
    pub jwks_refresh_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            platform_issuer: String::new(),
            jwks_url: String::new(),
            audience: None,
            api_token_secret: String::new(),
            clock_skew_secs: 30,
            jwks_refresh_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum resolved contexts held in the inheritance cache.
    pub inheritance_capacity: usize,
    /// Facade bundles older than this are rebuilt on next use.
    pub facade_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { inheritance_capacity: 1024, facade_ttl_secs: 3600 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Per-user request quota; `None` disables rate limiting.
    pub requests_per_second: Option<u32>,
    pub burst_size: u32,
    /// Upper bound on dependency edges per user.
    pub max_dependency_edges: usize,
    /// Bounded attempts for delegation application.
    pub delegation_max_attempts: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_second: None,
            burst_size: 10,
            max_dependency_edges: 10_000,
            delegation_max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_default_to_enabled() {
        let mut config = Config::default();
        assert!(config.tool_enabled("manage_task"));
        config.tools.insert("manage_task".to_string(), false);
        assert!(!config.tool_enabled("manage_task"));
    }
}
