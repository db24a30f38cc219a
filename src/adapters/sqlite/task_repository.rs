//! SQLite implementation of the TaskRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ProgressEntry, Task, TaskPriority, TaskStatus};
use crate::domain::ports::{TaskFilter, TaskRepository};

use super::project_repository::{parse_timestamp, parse_uuid};
use super::scope::UserScope;

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
    scope: UserScope,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, scope: UserScope::system() }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.scope = UserScope::user(user_id);
        self
    }

    async fn load_assignees(&self, task: &mut Task) -> DomainResult<()> {
        let rows = sqlx::query("SELECT assignee FROM task_assignees WHERE task_id = ? ORDER BY assignee")
            .bind(task.id.to_string())
            .fetch_all(&self.pool)
            .await?;
        task.assignees = rows.into_iter().map(|r| r.get::<String, _>(0)).collect();
        Ok(())
    }

    async fn load_dependencies(&self, task: &mut Task) -> DomainResult<()> {
        let rows = sqlx::query(
            "SELECT depends_on_id FROM task_dependencies WHERE task_id = ? ORDER BY created_at",
        )
        .bind(task.id.to_string())
        .fetch_all(&self.pool)
        .await?;
        task.dependencies = rows
            .into_iter()
            .map(|r| parse_uuid(r.get::<String, _>(0).as_str()))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(())
    }

    async fn hydrate(&self, row: TaskRow) -> DomainResult<Task> {
        let mut task: Task = row.try_into()?;
        self.load_assignees(&mut task).await?;
        self.load_dependencies(&mut task).await?;
        Ok(task)
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    branch_id: String,
    user_id: String,
    title: String,
    description: String,
    status: String,
    priority: String,
    labels: String,
    estimated_effort: Option<String>,
    due_date: Option<String>,
    progress_percentage: i64,
    progress_history: String,
    context_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = DomainError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let labels: Vec<String> = serde_json::from_str(&row.labels)?;
        let progress_history: Vec<ProgressEntry> = serde_json::from_str(&row.progress_history)?;
        Ok(Task {
            id: parse_uuid(&row.id)?,
            branch_id: parse_uuid(&row.branch_id)?,
            user_id: parse_uuid(&row.user_id)?,
            title: row.title,
            description: row.description,
            status: TaskStatus::from_str(&row.status)
                .ok_or_else(|| DomainError::Database(format!("corrupt status column: {}", row.status)))?,
            priority: TaskPriority::from_str(&row.priority)
                .ok_or_else(|| DomainError::Database(format!("corrupt priority column: {}", row.priority)))?,
            assignees: Vec::new(),
            labels,
            estimated_effort: row.estimated_effort,
            due_date: row.due_date.as_deref().map(parse_timestamp).transpose()?,
            progress_percentage: u8::try_from(row.progress_percentage)
                .map_err(|_| DomainError::Database("corrupt progress column".to_string()))?,
            progress_history,
            dependencies: Vec::new(),
            context_id: row.context_id.as_deref().map(parse_uuid).transpose()?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &Task) -> DomainResult<()> {
        let user_id = self.scope.require()?;
        let labels_json = serde_json::to_string(&task.labels)?;
        let history_json = serde_json::to_string(&task.progress_history)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO tasks (id, branch_id, user_id, title, description, status, priority,
                                labels, estimated_effort, due_date, progress_percentage,
                                progress_history, context_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id.to_string())
        .bind(task.branch_id.to_string())
        .bind(user_id.to_string())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(&labels_json)
        .bind(&task.estimated_effort)
        .bind(task.due_date.map(|t| t.to_rfc3339()))
        .bind(i64::from(task.progress_percentage))
        .bind(&history_json)
        .bind(task.context_id.map(|id| id.to_string()))
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for assignee in &task.assignees {
            sqlx::query(
                "INSERT INTO task_assignees (task_id, assignee, user_id) VALUES (?, ?, ?)",
            )
            .bind(task.id.to_string())
            .bind(assignee)
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;
        }

        for dep_id in &task.dependencies {
            sqlx::query(
                "INSERT INTO task_dependencies (task_id, depends_on_id, user_id, created_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(task.id.to_string())
            .bind(dep_id.to_string())
            .bind(user_id.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(
            "SELECT * FROM tasks WHERE id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(self.hydrate(r).await?)),
            None => Ok(None),
        }
    }

    async fn update(&self, task: &Task) -> DomainResult<()> {
        let user_id = self.scope.require()?;
        let labels_json = serde_json::to_string(&task.labels)?;
        let history_json = serde_json::to_string(&task.progress_history)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, status = ?, priority = ?,
                              labels = ?, estimated_effort = ?, due_date = ?,
                              progress_percentage = ?, progress_history = ?, context_id = ?,
                              updated_at = ?
             WHERE id = ? AND user_id = ?",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(&labels_json)
        .bind(&task.estimated_effort)
        .bind(task.due_date.map(|t| t.to_rfc3339()))
        .bind(i64::from(task.progress_percentage))
        .bind(&history_json)
        .bind(task.context_id.map(|id| id.to_string()))
        .bind(Utc::now().to_rfc3339())
        .bind(task.id.to_string())
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Task", task.id));
        }

        // Replace the assignee set wholesale.
        sqlx::query("DELETE FROM task_assignees WHERE task_id = ?")
            .bind(task.id.to_string())
            .execute(&mut *tx)
            .await?;
        for assignee in &task.assignees {
            sqlx::query(
                "INSERT INTO task_assignees (task_id, assignee, user_id) VALUES (?, ?, ?)",
            )
            .bind(task.id.to_string())
            .bind(assignee)
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND (? IS NULL OR user_id = ?)")
            .bind(id.to_string())
            .bind(self.scope.filter())
            .bind(self.scope.filter())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Task", id));
        }

        sqlx::query(
            "DELETE FROM contexts
             WHERE (? IS NULL OR user_id = ?) AND level = 'task' AND id = ?",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
        let mut query = String::from(
            "SELECT DISTINCT t.* FROM tasks t
             LEFT JOIN task_assignees a ON a.task_id = t.id
             WHERE (? IS NULL OR t.user_id = ?)",
        );
        let mut bindings: Vec<String> = Vec::new();

        if let Some(branch_id) = &filter.branch_id {
            query.push_str(" AND t.branch_id = ?");
            bindings.push(branch_id.to_string());
        }
        if let Some(status) = &filter.status {
            query.push_str(" AND t.status = ?");
            bindings.push(status.as_str().to_string());
        }
        if let Some(priority) = &filter.priority {
            query.push_str(" AND t.priority = ?");
            bindings.push(priority.as_str().to_string());
        }
        if let Some(assignee) = &filter.assignee {
            query.push_str(" AND a.assignee = ?");
            bindings.push(assignee.clone());
        }
        if let Some(label) = &filter.label {
            query.push_str(" AND t.labels LIKE ?");
            bindings.push(format!("%\"{label}\"%"));
        }

        query.push_str(" ORDER BY t.created_at");
        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let mut q = sqlx::query_as::<_, TaskRow>(&query)
            .bind(self.scope.filter())
            .bind(self.scope.filter());
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<TaskRow> = q.fetch_all(&self.pool).await?;
        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            tasks.push(self.hydrate(row).await?);
        }
        Ok(tasks)
    }

    async fn list_by_branch(&self, branch_id: Uuid) -> DomainResult<Vec<Task>> {
        self.list(TaskFilter { branch_id: Some(branch_id), ..Default::default() }).await
    }

    async fn existing_ids(&self, ids: &[Uuid]) -> DomainResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let query = format!(
            "SELECT id FROM tasks WHERE (? IS NULL OR user_id = ?) AND id IN ({placeholders})"
        );
        let mut q = sqlx::query(&query).bind(self.scope.filter()).bind(self.scope.filter());
        for id in ids {
            q = q.bind(id.to_string());
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| parse_uuid(r.get::<String, _>(0).as_str()))
            .collect()
    }

    async fn delete_terminal_before(&self, project_id: Uuid, cutoff: DateTime<Utc>) -> DomainResult<usize> {
        // Remove stale task contexts first; the edge/assignee/subtask rows
        // cascade with the task rows.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM contexts
             WHERE (? IS NULL OR user_id = ?) AND level = 'task' AND id IN
                   (SELECT t.id FROM tasks t
                      JOIN branches b ON b.id = t.branch_id
                     WHERE (? IS NULL OR t.user_id = ?)
                       AND b.project_id = ?
                       AND t.status IN ('done', 'cancelled') AND t.updated_at < ?)",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .bind(project_id.to_string())
        .bind(cutoff.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "DELETE FROM tasks
             WHERE (? IS NULL OR user_id = ?)
               AND branch_id IN (SELECT id FROM branches WHERE project_id = ?)
               AND status IN ('done', 'cancelled') AND updated_at < ?",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .bind(project_id.to_string())
        .bind(cutoff.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() as usize)
    }
}
