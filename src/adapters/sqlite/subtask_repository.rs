//! SQLite implementation of the SubtaskRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Subtask, TaskPriority, TaskStatus};
use crate::domain::ports::SubtaskRepository;

use super::project_repository::{parse_timestamp, parse_uuid};
use super::scope::UserScope;

#[derive(Clone)]
pub struct SqliteSubtaskRepository {
    pool: SqlitePool,
    scope: UserScope,
}

impl SqliteSubtaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, scope: UserScope::system() }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.scope = UserScope::user(user_id);
        self
    }
}

#[derive(sqlx::FromRow)]
struct SubtaskRow {
    id: String,
    task_id: String,
    user_id: String,
    title: String,
    description: String,
    status: String,
    priority: String,
    assignees: String,
    progress_percentage: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<SubtaskRow> for Subtask {
    type Error = DomainError;

    fn try_from(row: SubtaskRow) -> Result<Self, Self::Error> {
        Ok(Subtask {
            id: parse_uuid(&row.id)?,
            task_id: parse_uuid(&row.task_id)?,
            user_id: parse_uuid(&row.user_id)?,
            title: row.title,
            description: row.description,
            status: TaskStatus::from_str(&row.status)
                .ok_or_else(|| DomainError::Database(format!("corrupt status column: {}", row.status)))?,
            priority: TaskPriority::from_str(&row.priority)
                .ok_or_else(|| DomainError::Database(format!("corrupt priority column: {}", row.priority)))?,
            assignees: serde_json::from_str(&row.assignees)?,
            progress_percentage: u8::try_from(row.progress_percentage)
                .map_err(|_| DomainError::Database("corrupt progress column".to_string()))?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl SubtaskRepository for SqliteSubtaskRepository {
    async fn create(&self, subtask: &Subtask) -> DomainResult<()> {
        let user_id = self.scope.require()?;
        sqlx::query(
            "INSERT INTO subtasks (id, task_id, user_id, title, description, status, priority,
                                   assignees, progress_percentage, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(subtask.id.to_string())
        .bind(subtask.task_id.to_string())
        .bind(user_id.to_string())
        .bind(&subtask.title)
        .bind(&subtask.description)
        .bind(subtask.status.as_str())
        .bind(subtask.priority.as_str())
        .bind(serde_json::to_string(&subtask.assignees)?)
        .bind(i64::from(subtask.progress_percentage))
        .bind(subtask.created_at.to_rfc3339())
        .bind(subtask.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Subtask>> {
        let row: Option<SubtaskRow> = sqlx::query_as(
            "SELECT * FROM subtasks WHERE id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Subtask::try_from).transpose()
    }

    async fn update(&self, subtask: &Subtask) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE subtasks SET title = ?, description = ?, status = ?, priority = ?,
                                 assignees = ?, progress_percentage = ?, updated_at = ?
             WHERE id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(&subtask.title)
        .bind(&subtask.description)
        .bind(subtask.status.as_str())
        .bind(subtask.priority.as_str())
        .bind(serde_json::to_string(&subtask.assignees)?)
        .bind(i64::from(subtask.progress_percentage))
        .bind(Utc::now().to_rfc3339())
        .bind(subtask.id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Subtask", subtask.id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM subtasks WHERE id = ? AND (? IS NULL OR user_id = ?)")
            .bind(id.to_string())
            .bind(self.scope.filter())
            .bind(self.scope.filter())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Subtask", id));
        }
        Ok(())
    }

    async fn list_by_task(&self, task_id: Uuid) -> DomainResult<Vec<Subtask>> {
        let rows: Vec<SubtaskRow> = sqlx::query_as(
            "SELECT * FROM subtasks
             WHERE task_id = ? AND (? IS NULL OR user_id = ?) ORDER BY created_at",
        )
        .bind(task_id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Subtask::try_from).collect()
    }
}
