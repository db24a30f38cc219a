//! SQLite pool construction.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::config::DatabaseConfig;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid database URL '{0}'")]
    InvalidUrl(String),
    #[error("Failed to prepare database directory: {0}")]
    Bootstrap(#[source] std::io::Error),
    #[error("Database unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
}

/// Filesystem path behind a `sqlite:` URL; `None` for in-memory databases.
fn sqlite_path(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    (!path.is_empty() && path != ":memory:").then(|| Path::new(path))
}

/// Open the pool described by the config and probe it with a trivial
/// query, so a bad URL fails at startup instead of on the first request.
/// All timeouts come from the config: `acquire_timeout_secs` bounds pool
/// checkout, `busy_timeout_secs` bounds the wait on SQLite's write lock.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, ConnectionError> {
    if let Some(parent) = sqlite_path(&config.url).and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(ConnectionError::Bootstrap)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|_| ConnectionError::InvalidUrl(config.url.clone()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await
        .map_err(ConnectionError::Unavailable)?;

    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(ConnectionError::Unavailable)?;

    Ok(pool)
}

/// Single-connection in-memory pool for tests. Foreign keys stay on so
/// cascade behavior matches production.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|_| ConnectionError::InvalidUrl("sqlite::memory:".to_string()))?
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(ConnectionError::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_path_extraction() {
        assert!(sqlite_path("sqlite::memory:").is_none());
        assert!(sqlite_path("sqlite:").is_none());
        assert_eq!(
            sqlite_path("sqlite:.taskhub/taskhub.db"),
            Some(Path::new(".taskhub/taskhub.db"))
        );
        assert_eq!(
            sqlite_path("sqlite:///var/lib/taskhub/hub.db"),
            Some(Path::new("/var/lib/taskhub/hub.db"))
        );
    }
}
