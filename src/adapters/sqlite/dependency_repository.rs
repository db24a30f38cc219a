//! SQLite implementation of the DependencyRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{DependencyEdge, DependencyRepository};

use super::project_repository::parse_uuid;
use super::scope::UserScope;

#[derive(Clone)]
pub struct SqliteDependencyRepository {
    pool: SqlitePool,
    scope: UserScope,
}

impl SqliteDependencyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, scope: UserScope::system() }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.scope = UserScope::user(user_id);
        self
    }
}

#[async_trait]
impl DependencyRepository for SqliteDependencyRepository {
    async fn add(&self, task_id: Uuid, depends_on_id: Uuid) -> DomainResult<()> {
        let user_id = self.scope.require()?;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO task_dependencies (task_id, depends_on_id, user_id, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(task_id.to_string())
        .bind(depends_on_id.to_string())
        .bind(user_id.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::Conflict(format!(
                "dependency {task_id} -> {depends_on_id} already exists"
            )));
        }
        Ok(())
    }

    async fn remove(&self, task_id: Uuid, depends_on_id: Uuid) -> DomainResult<()> {
        let result = sqlx::query(
            "DELETE FROM task_dependencies
             WHERE task_id = ? AND depends_on_id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(task_id.to_string())
        .bind(depends_on_id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Dependency", format!("{task_id} -> {depends_on_id}")));
        }
        Ok(())
    }

    async fn clear_for_task(&self, task_id: Uuid) -> DomainResult<usize> {
        let result = sqlx::query(
            "DELETE FROM task_dependencies WHERE task_id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(task_id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn dependencies_of(&self, task_id: Uuid) -> DomainResult<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT depends_on_id FROM task_dependencies
             WHERE task_id = ? AND (? IS NULL OR user_id = ?) ORDER BY created_at",
        )
        .bind(task_id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| parse_uuid(r.get::<String, _>(0).as_str()))
            .collect()
    }

    async fn dependents_of(&self, task_id: Uuid) -> DomainResult<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT task_id FROM task_dependencies
             WHERE depends_on_id = ? AND (? IS NULL OR user_id = ?) ORDER BY created_at",
        )
        .bind(task_id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| parse_uuid(r.get::<String, _>(0).as_str()))
            .collect()
    }

    async fn all_edges(&self) -> DomainResult<Vec<DependencyEdge>> {
        let rows = sqlx::query(
            "SELECT task_id, depends_on_id FROM task_dependencies WHERE (? IS NULL OR user_id = ?)",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(DependencyEdge {
                    task_id: parse_uuid(r.get::<String, _>(0).as_str())?,
                    depends_on_id: parse_uuid(r.get::<String, _>(1).as_str())?,
                })
            })
            .collect()
    }

    async fn count(&self) -> DomainResult<usize> {
        let row = sqlx::query(
            "SELECT COUNT(*) FROM task_dependencies WHERE (? IS NULL OR user_id = ?)",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>(0) as usize)
    }
}
