//! Task repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Task, TaskPriority, TaskStatus};

/// Filter criteria for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub branch_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee: Option<String>,
    pub label: Option<String>,
    pub limit: Option<i64>,
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: &Task) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>>;

    async fn update(&self, task: &Task) -> DomainResult<()>;

    /// Delete the task; subtasks, its context row, assignee rows, and
    /// dependency edges touching it cascade.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>>;

    /// Tasks under one branch. Counter projection and facades depend on
    /// this finder existing.
    async fn list_by_branch(&self, branch_id: Uuid) -> DomainResult<Vec<Task>>;

    /// Ids of every task in scope; used to bound dependency graph walks.
    async fn existing_ids(&self, ids: &[Uuid]) -> DomainResult<Vec<Uuid>>;

    /// Delete a project's terminal tasks last touched before `cutoff`,
    /// returning how many rows went away. Their context rows, subtasks,
    /// assignees, and dependency edges go with them. Backs the
    /// `cleanup_obsolete` maintenance action.
    async fn delete_terminal_before(
        &self,
        project_id: Uuid,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> DomainResult<usize>;
}
