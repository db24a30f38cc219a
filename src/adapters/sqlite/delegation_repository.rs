//! SQLite implementation of the DelegationRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ContextLevel, Delegation, DelegationStatus};
use crate::domain::ports::DelegationRepository;

use super::project_repository::{parse_timestamp, parse_uuid};
use super::scope::UserScope;

#[derive(Clone)]
pub struct SqliteDelegationRepository {
    pool: SqlitePool,
    scope: UserScope,
}

impl SqliteDelegationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, scope: UserScope::system() }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.scope = UserScope::user(user_id);
        self
    }
}

#[derive(sqlx::FromRow)]
struct DelegationRow {
    id: String,
    user_id: String,
    source_level: String,
    source_id: String,
    target_level: String,
    payload: String,
    status: String,
    attempts: i64,
    last_error: Option<String>,
    created_at: String,
    processed_at: Option<String>,
}

impl TryFrom<DelegationRow> for Delegation {
    type Error = DomainError;

    fn try_from(row: DelegationRow) -> Result<Self, Self::Error> {
        Ok(Delegation {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            source_level: ContextLevel::from_str(&row.source_level)
                .ok_or_else(|| DomainError::Database(format!("corrupt level column: {}", row.source_level)))?,
            source_id: parse_uuid(&row.source_id)?,
            target_level: ContextLevel::from_str(&row.target_level)
                .ok_or_else(|| DomainError::Database(format!("corrupt level column: {}", row.target_level)))?,
            payload: serde_json::from_str(&row.payload)?,
            status: DelegationStatus::from_str(&row.status)
                .ok_or_else(|| DomainError::Database(format!("corrupt status column: {}", row.status)))?,
            attempts: u32::try_from(row.attempts)
                .map_err(|_| DomainError::Database("corrupt attempts column".to_string()))?,
            last_error: row.last_error,
            created_at: parse_timestamp(&row.created_at)?,
            processed_at: row.processed_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

#[async_trait]
impl DelegationRepository for SqliteDelegationRepository {
    async fn insert(&self, delegation: &Delegation) -> DomainResult<()> {
        let user_id = self.scope.require()?;
        sqlx::query(
            "INSERT INTO delegations (id, user_id, source_level, source_id, target_level,
                                      payload, status, attempts, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(delegation.id.to_string())
        .bind(user_id.to_string())
        .bind(delegation.source_level.as_str())
        .bind(delegation.source_id.to_string())
        .bind(delegation.target_level.as_str())
        .bind(serde_json::to_string(&delegation.payload)?)
        .bind(delegation.status.as_str())
        .bind(i64::from(delegation.attempts))
        .bind(delegation.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Delegation>> {
        let row: Option<DelegationRow> = sqlx::query_as(
            "SELECT * FROM delegations WHERE id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Delegation::try_from).transpose()
    }

    async fn pending(&self) -> DomainResult<Vec<Delegation>> {
        let rows: Vec<DelegationRow> = sqlx::query_as(
            "SELECT * FROM delegations
             WHERE status = 'pending' AND (? IS NULL OR user_id = ?) ORDER BY created_at",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Delegation::try_from).collect()
    }

    async fn mark_processed(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE delegations SET status = 'processed', processed_at = ?
             WHERE id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Delegation", id));
        }
        Ok(())
    }

    async fn record_failure(&self, id: Uuid, attempts: u32, error: &str, terminal: bool) -> DomainResult<()> {
        let status = if terminal { "failed" } else { "pending" };
        let result = sqlx::query(
            "UPDATE delegations SET attempts = ?, last_error = ?, status = ?
             WHERE id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(i64::from(attempts))
        .bind(error)
        .bind(status)
        .bind(id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Delegation", id));
        }
        Ok(())
    }

    async fn list(&self) -> DomainResult<Vec<Delegation>> {
        let rows: Vec<DelegationRow> = sqlx::query_as(
            "SELECT * FROM delegations WHERE (? IS NULL OR user_id = ?) ORDER BY created_at",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Delegation::try_from).collect()
    }
}
