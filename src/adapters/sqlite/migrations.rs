//! Schema migration management.
//!
//! Migrations run at startup in order, each in its own transaction, with the
//! outcome recorded in `applied_migrations`. A failed migration halts
//! startup and leaves a `success = 0` row; clearing that row makes the next
//! startup retry it.

use sqlx::{Row, SqlitePool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration '{name}' failed: {source}")]
    ExecutionFailed { name: String, #[source] source: sqlx::Error },
    #[error("Failed to read migration ledger: {0}")]
    LedgerError(#[source] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply every embedded migration not yet recorded as successful.
    /// Returns the number applied this run.
    pub async fn run(&self) -> Result<usize, MigrationError> {
        self.ensure_ledger().await?;

        let mut applied = 0;
        for migration in embedded_migrations() {
            if self.already_applied(migration.name).await? {
                continue;
            }
            self.apply(&migration).await?;
            applied += 1;
        }
        Ok(applied)
    }

    async fn ensure_ledger(&self) -> Result<(), MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS applied_migrations (
                migration_name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now')),
                success INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(MigrationError::LedgerError)?;
        Ok(())
    }

    async fn already_applied(&self, name: &str) -> Result<bool, MigrationError> {
        let row = sqlx::query("SELECT success FROM applied_migrations WHERE migration_name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(MigrationError::LedgerError)?;
        Ok(row.is_some_and(|r| r.get::<i64, _>(0) == 1))
    }

    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MigrationError::ExecutionFailed { name: migration.name.to_string(), source: e })?;

        if let Err(e) = sqlx::raw_sql(migration.sql).execute(&mut *tx).await {
            // Roll back the schema change but keep a failure record so the
            // operator can see what halted startup.
            drop(tx);
            let _ = sqlx::query(
                "INSERT OR REPLACE INTO applied_migrations (migration_name, success) VALUES (?, 0)",
            )
            .bind(migration.name)
            .execute(&self.pool)
            .await;
            return Err(MigrationError::ExecutionFailed { name: migration.name.to_string(), source: e });
        }

        sqlx::query(
            "INSERT OR REPLACE INTO applied_migrations (migration_name, success) VALUES (?, 1)",
        )
        .bind(migration.name)
        .execute(&mut *tx)
        .await
        .map_err(|e| MigrationError::ExecutionFailed { name: migration.name.to_string(), source: e })?;

        tx.commit()
            .await
            .map_err(|e| MigrationError::ExecutionFailed { name: migration.name.to_string(), source: e })?;

        tracing::info!(migration = migration.name, "Applied migration");
        Ok(())
    }
}

pub fn embedded_migrations() -> Vec<Migration> {
    vec![
        Migration {
            name: "001_initial_schema",
            sql: include_str!("../../../migrations/001_initial_schema.sql"),
        },
        Migration {
            name: "002_context_schema",
            sql: include_str!("../../../migrations/002_context_schema.sql"),
        },
        Migration {
            name: "003_counter_triggers",
            sql: include_str!("../../../migrations/003_counter_triggers.sql"),
        },
    ]
}
