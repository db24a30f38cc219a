//! SQLite implementation of the BranchRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Branch;
use crate::domain::ports::{BranchRepository, CounterDrift};

use super::project_repository::{parse_timestamp, parse_uuid};
use super::scope::UserScope;

#[derive(Clone)]
pub struct SqliteBranchRepository {
    pool: SqlitePool,
    scope: UserScope,
}

impl SqliteBranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, scope: UserScope::system() }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.scope = UserScope::user(user_id);
        self
    }
}

#[derive(sqlx::FromRow)]
struct BranchRow {
    id: String,
    project_id: String,
    user_id: String,
    name: String,
    description: String,
    task_count: i64,
    completed_task_count: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<BranchRow> for Branch {
    type Error = DomainError;

    fn try_from(row: BranchRow) -> Result<Self, Self::Error> {
        Ok(Branch {
            id: parse_uuid(&row.id)?,
            project_id: parse_uuid(&row.project_id)?,
            user_id: parse_uuid(&row.user_id)?,
            name: row.name,
            description: row.description,
            task_count: row.task_count,
            completed_task_count: row.completed_task_count,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl BranchRepository for SqliteBranchRepository {
    async fn create(&self, branch: &Branch) -> DomainResult<()> {
        let user_id = self.scope.require()?;
        if self.get_by_name(branch.project_id, &branch.name).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "branch name '{}' already exists in project {}",
                branch.name, branch.project_id
            )));
        }

        sqlx::query(
            "INSERT INTO branches (id, project_id, user_id, name, description,
                                   task_count, completed_task_count, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 0, 0, ?, ?)",
        )
        .bind(branch.id.to_string())
        .bind(branch.project_id.to_string())
        .bind(user_id.to_string())
        .bind(&branch.name)
        .bind(&branch.description)
        .bind(branch.created_at.to_rfc3339())
        .bind(branch.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Branch>> {
        let row: Option<BranchRow> = sqlx::query_as(
            "SELECT * FROM branches WHERE id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Branch::try_from).transpose()
    }

    async fn get_by_name(&self, project_id: Uuid, name: &str) -> DomainResult<Option<Branch>> {
        let row: Option<BranchRow> = sqlx::query_as(
            "SELECT * FROM branches
             WHERE project_id = ? AND name = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(project_id.to_string())
        .bind(name)
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Branch::try_from).transpose()
    }

    async fn list_by_project(&self, project_id: Uuid) -> DomainResult<Vec<Branch>> {
        let rows: Vec<BranchRow> = sqlx::query_as(
            "SELECT * FROM branches
             WHERE project_id = ? AND (? IS NULL OR user_id = ?) ORDER BY created_at",
        )
        .bind(project_id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Branch::try_from).collect()
    }

    async fn update(&self, branch: &Branch) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE branches SET name = ?, description = ?, updated_at = ?
             WHERE id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(&branch.name)
        .bind(&branch.description)
        .bind(Utc::now().to_rfc3339())
        .bind(branch.id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Branch", branch.id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM branches WHERE id = ? AND (? IS NULL OR user_id = ?)")
            .bind(id.to_string())
            .bind(self.scope.filter())
            .bind(self.scope.filter())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Branch", id));
        }

        sqlx::query(
            "DELETE FROM contexts
             WHERE (? IS NULL OR user_id = ?) AND level = 'task' AND parent_id = ?",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM contexts
             WHERE (? IS NULL OR user_id = ?) AND level = 'branch' AND id = ?",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn counter_drift(&self) -> DomainResult<Vec<CounterDrift>> {
        let rows = sqlx::query(
            "SELECT b.id,
                    b.task_count,
                    b.completed_task_count,
                    (SELECT COUNT(*) FROM tasks t WHERE t.branch_id = b.id) AS actual_count,
                    (SELECT COUNT(*) FROM tasks t
                      WHERE t.branch_id = b.id AND t.status = 'done') AS actual_done
             FROM branches b WHERE (? IS NULL OR b.user_id = ?)",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        let mut drift = Vec::new();
        for row in rows {
            let stored_task_count: i64 = row.get("task_count");
            let stored_completed_count: i64 = row.get("completed_task_count");
            let actual_task_count: i64 = row.get("actual_count");
            let actual_completed_count: i64 = row.get("actual_done");
            if stored_task_count != actual_task_count
                || stored_completed_count != actual_completed_count
            {
                drift.push(CounterDrift {
                    branch_id: parse_uuid(row.get::<String, _>("id").as_str())?,
                    stored_task_count,
                    actual_task_count,
                    stored_completed_count,
                    actual_completed_count,
                });
            }
        }
        Ok(drift)
    }

    async fn recompute_counters(&self) -> DomainResult<usize> {
        let drift = self.counter_drift().await?;
        for d in &drift {
            sqlx::query(
                "UPDATE branches SET task_count = ?, completed_task_count = ? WHERE id = ?",
            )
            .bind(d.actual_task_count)
            .bind(d.actual_completed_count)
            .bind(d.branch_id.to_string())
            .execute(&self.pool)
            .await?;
        }
        Ok(drift.len())
    }
}
