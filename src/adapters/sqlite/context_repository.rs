//! SQLite implementation of the ContextRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ContextLevel, ContextRecord};
use crate::domain::ports::ContextRepository;

use super::project_repository::{parse_timestamp, parse_uuid};
use super::scope::UserScope;

#[derive(Clone)]
pub struct SqliteContextRepository {
    pool: SqlitePool,
    scope: UserScope,
}

impl SqliteContextRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, scope: UserScope::system() }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.scope = UserScope::user(user_id);
        self
    }
}

#[derive(sqlx::FromRow)]
struct ContextRow {
    id: String,
    user_id: String,
    level: String,
    parent_id: Option<String>,
    data: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ContextRow> for ContextRecord {
    type Error = DomainError;

    fn try_from(row: ContextRow) -> Result<Self, Self::Error> {
        Ok(ContextRecord {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            level: ContextLevel::from_str(&row.level)
                .ok_or_else(|| DomainError::Database(format!("corrupt level column: {}", row.level)))?,
            parent_id: row.parent_id.as_deref().map(parse_uuid).transpose()?,
            data: serde_json::from_str(&row.data)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl ContextRepository for SqliteContextRepository {
    async fn insert(&self, record: &ContextRecord) -> DomainResult<()> {
        let user_id = self.scope.require()?;
        sqlx::query(
            "INSERT INTO contexts (id, user_id, level, parent_id, data, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(user_id.to_string())
        .bind(record.level.as_str())
        .bind(record.parent_id.map(|id| id.to_string()))
        .bind(serde_json::to_string(&record.data)?)
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, level: ContextLevel, id: Uuid) -> DomainResult<Option<ContextRecord>> {
        let row: Option<ContextRow> = sqlx::query_as(
            "SELECT * FROM contexts WHERE level = ? AND id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(level.as_str())
        .bind(id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ContextRecord::try_from).transpose()
    }

    async fn update_data(
        &self,
        level: ContextLevel,
        id: Uuid,
        data: &serde_json::Value,
    ) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE contexts SET data = ?, updated_at = ?
             WHERE level = ? AND id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(serde_json::to_string(data)?)
        .bind(Utc::now().to_rfc3339())
        .bind(level.as_str())
        .bind(id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Context", id));
        }
        Ok(())
    }

    async fn delete(&self, level: ContextLevel, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query(
            "DELETE FROM contexts WHERE level = ? AND id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(level.as_str())
        .bind(id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Context", id));
        }
        Ok(())
    }

    async fn children_of(&self, level: ContextLevel, id: Uuid) -> DomainResult<Vec<ContextRecord>> {
        let Some(child_level) = child_of(level) else {
            return Ok(Vec::new());
        };
        let rows: Vec<ContextRow> = sqlx::query_as(
            "SELECT * FROM contexts
             WHERE level = ? AND parent_id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(child_level.as_str())
        .bind(id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ContextRecord::try_from).collect()
    }

    async fn find_ancestors(&self, level: ContextLevel, id: Uuid) -> DomainResult<Vec<ContextRecord>> {
        let mut chain = Vec::new();
        let Some(mut current) = self.get(level, id).await? else {
            return Ok(chain);
        };

        while let (Some(parent_level), Some(parent_id)) = (current.level.parent(), current.parent_id) {
            match self.get(parent_level, parent_id).await? {
                Some(parent) => {
                    chain.push(parent.clone());
                    current = parent;
                }
                // Ancestors are materialized on write, so a gap means the
                // walk is done (or the tree predates that invariant).
                None => break,
            }
        }

        chain.reverse();
        Ok(chain)
    }
}

fn child_of(level: ContextLevel) -> Option<ContextLevel> {
    match level {
        ContextLevel::Global => Some(ContextLevel::Project),
        ContextLevel::Project => Some(ContextLevel::Branch),
        ContextLevel::Branch => Some(ContextLevel::Task),
        ContextLevel::Task => None,
    }
}
