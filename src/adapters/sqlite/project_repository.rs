//! SQLite implementation of the ProjectRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Project;
use crate::domain::ports::ProjectRepository;

use super::scope::UserScope;

#[derive(Clone)]
pub struct SqliteProjectRepository {
    pool: SqlitePool,
    scope: UserScope,
}

impl SqliteProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, scope: UserScope::system() }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.scope = UserScope::user(user_id);
        self
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    user_id: String,
    name: String,
    description: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ProjectRow> for Project {
    type Error = DomainError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        Ok(Project {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            name: row.name,
            description: row.description,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

pub(super) fn parse_uuid(s: &str) -> DomainResult<Uuid> {
    Uuid::try_parse(s).map_err(|_| DomainError::Database(format!("corrupt uuid column: {s}")))
}

pub(super) fn parse_timestamp(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| DomainError::Database(format!("corrupt timestamp column: {s}")))
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn create(&self, project: &Project) -> DomainResult<()> {
        let user_id = self.scope.require()?;
        let existing = self.get_by_name(&project.name).await?;
        if existing.is_some() {
            return Err(DomainError::Conflict(format!(
                "project name '{}' already exists",
                project.name
            )));
        }

        sqlx::query(
            "INSERT INTO projects (id, user_id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(project.id.to_string())
        .bind(user_id.to_string())
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.created_at.to_rfc3339())
        .bind(project.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as(
            "SELECT * FROM projects WHERE id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Project::try_from).transpose()
    }

    async fn get_by_name(&self, name: &str) -> DomainResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as(
            "SELECT * FROM projects WHERE name = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(name)
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Project::try_from).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<Project>> {
        let rows: Vec<ProjectRow> = sqlx::query_as(
            "SELECT * FROM projects WHERE (? IS NULL OR user_id = ?) ORDER BY created_at",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Project::try_from).collect()
    }

    async fn update(&self, project: &Project) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE projects SET name = ?, description = ?, updated_at = ?
             WHERE id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(Utc::now().to_rfc3339())
        .bind(project.id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Project", project.id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        // Foreign keys cascade branches -> tasks -> subtasks/edges/assignees.
        // Context rows live in a parallel tree and are removed here too.
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = ? AND (? IS NULL OR user_id = ?)")
            .bind(id.to_string())
            .bind(self.scope.filter())
            .bind(self.scope.filter())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Project", id));
        }

        // Bottom-up: task contexts under the project's branch contexts,
        // then branch contexts, then the project context itself.
        sqlx::query(
            "DELETE FROM contexts
             WHERE (? IS NULL OR user_id = ?) AND level = 'task' AND parent_id IN
                   (SELECT id FROM contexts WHERE level = 'branch' AND parent_id = ?)",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM contexts
             WHERE (? IS NULL OR user_id = ?) AND level = 'branch' AND parent_id = ?",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM contexts
             WHERE (? IS NULL OR user_id = ?) AND level = 'project' AND id = ?",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
