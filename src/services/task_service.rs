//! Task use cases.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ChangeEvent, EntityKind, SubtaskSummary, Task, TaskPriority, TaskStatus,
};
use crate::domain::ports::{
    BranchRepository, ChangeNotifier, SubtaskRepository, TaskFilter, TaskRepository,
};

use super::context::InheritanceCache;
use super::dependency_graph::{DependencyGraphService, TaskAnnotations};

/// Input for task creation. Dependencies may come from any of the loose
/// wire shapes; by the time they reach here they are UUIDs.
#[derive(Debug, Clone, Default)]
pub struct CreateTaskInput {
    pub branch_id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: Option<TaskPriority>,
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
    pub estimated_effort: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub dependencies: Vec<Uuid>,
}

/// Patch for task update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignees: Option<Vec<String>>,
    pub labels: Option<Vec<String>>,
    pub estimated_effort: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub progress_percentage: Option<u8>,
}

/// A task with its blocking-state annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    #[serde(flatten)]
    pub annotations: TaskAnnotations,
}

/// Result of completing a task. Open subtasks do not block completion but
/// are surfaced so the caller can warn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub task: Task,
    pub subtask_summary: SubtaskSummary,
    pub open_subtasks: usize,
}

#[derive(Clone)]
pub struct TaskService {
    user_id: Uuid,
    tasks: Arc<dyn TaskRepository>,
    branches: Arc<dyn BranchRepository>,
    subtasks: Arc<dyn SubtaskRepository>,
    graph: DependencyGraphService,
    cache: Arc<InheritanceCache>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl TaskService {
    pub fn new(
        user_id: Uuid,
        tasks: Arc<dyn TaskRepository>,
        branches: Arc<dyn BranchRepository>,
        subtasks: Arc<dyn SubtaskRepository>,
        graph: DependencyGraphService,
        cache: Arc<InheritanceCache>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self { user_id, tasks, branches, subtasks, graph, cache, notifier }
    }

    pub async fn create(&self, input: CreateTaskInput) -> DomainResult<Task> {
        self.branches
            .get(input.branch_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Branch", input.branch_id))?;

        let mut task = Task::new(self.user_id, input.branch_id, input.title, input.description)
            .with_assignees(input.assignees);
        if let Some(priority) = input.priority {
            task.priority = priority;
        }
        task.labels = input.labels;
        task.estimated_effort = input.estimated_effort;
        task.due_date = input.due_date;

        // A fresh task can only close a cycle onto itself.
        if input.dependencies.contains(&task.id) {
            return Err(DomainError::Conflict("task cannot depend on itself".to_string()));
        }
        let mut dependencies = input.dependencies;
        dependencies.sort_unstable();
        dependencies.dedup();
        if !dependencies.is_empty() {
            let found = self.tasks.existing_ids(&dependencies).await?;
            if let Some(missing) = dependencies.iter().find(|d| !found.contains(d)) {
                return Err(DomainError::not_found("Task", *missing));
            }
        }
        task.dependencies = dependencies;

        task.validate().map_err(DomainError::Validation)?;
        self.tasks.create(&task).await?;
        self.notifier.notify(ChangeEvent::new("created", EntityKind::Task, task.id, self.user_id));
        Ok(task)
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<TaskView> {
        let task = self
            .tasks
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Task", id))?;
        let annotations = self.graph.annotate(&task).await?;
        Ok(TaskView { task, annotations })
    }

    pub async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<TaskView>> {
        let tasks = self.tasks.list(filter).await?;
        let mut views = Vec::with_capacity(tasks.len());
        for task in tasks {
            let annotations = self.graph.annotate(&task).await?;
            views.push(TaskView { task, annotations });
        }
        Ok(views)
    }

    pub async fn update(&self, id: Uuid, patch: UpdateTaskInput) -> DomainResult<Task> {
        let mut task = self
            .tasks
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Task", id))?;

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(status) = patch.status {
            if status == TaskStatus::InProgress {
                let annotations = self.graph.annotate(&task).await?;
                if annotations.is_blocked {
                    return Err(DomainError::PreconditionFailed(format!(
                        "task {id} is blocked by {} incomplete dependenc(ies)",
                        annotations.blocking_task_ids.len()
                    )));
                }
            }
            task.status = status;
            if status == TaskStatus::Done {
                task.progress_percentage = 100;
            }
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(assignees) = patch.assignees {
            task.assignees = assignees;
        }
        if let Some(labels) = patch.labels {
            task.labels = labels;
        }
        if let Some(effort) = patch.estimated_effort {
            task.estimated_effort = Some(effort);
        }
        if let Some(due) = patch.due_date {
            task.due_date = Some(due);
        }
        if let Some(progress) = patch.progress_percentage {
            task.set_progress(progress).map_err(DomainError::Validation)?;
        }

        task.validate().map_err(DomainError::Validation)?;
        task.updated_at = Utc::now();
        self.tasks.update(&task).await?;
        self.notifier.notify(ChangeEvent::new("updated", EntityKind::Task, id, self.user_id));
        Ok(task)
    }

    /// Complete a task. Open subtasks are allowed but reported so the
    /// caller can attach a warning.
    pub async fn complete(&self, id: Uuid) -> DomainResult<CompletionOutcome> {
        let mut task = self
            .tasks
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Task", id))?;

        if task.status == TaskStatus::Done {
            return Err(DomainError::PreconditionFailed(format!("task {id} is already done")));
        }

        let subtasks = self.subtasks.list_by_task(id).await?;
        let subtask_summary = SubtaskSummary::from_subtasks(&subtasks);

        task.complete();
        self.tasks.update(&task).await?;
        self.notifier.notify(ChangeEvent::new("completed", EntityKind::Task, id, self.user_id));

        Ok(CompletionOutcome {
            open_subtasks: subtask_summary.open_count(),
            subtask_summary,
            task,
        })
    }

    /// Append a numbered progress entry, optionally moving the percentage.
    pub async fn append_progress(
        &self,
        id: Uuid,
        content: &str,
        percentage: Option<u8>,
    ) -> DomainResult<Task> {
        if content.trim().is_empty() {
            return Err(DomainError::Validation("progress content cannot be empty".to_string()));
        }
        let mut task = self
            .tasks
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Task", id))?;

        task.append_progress(content, percentage).map_err(DomainError::Validation)?;
        self.tasks.update(&task).await?;
        self.notifier.notify(ChangeEvent::new("progress", EntityKind::Task, id, self.user_id));
        Ok(task)
    }

    pub async fn delete(&self, id: Uuid) -> DomainResult<()> {
        if self.tasks.get(id).await?.is_none() {
            return Err(DomainError::not_found("Task", id));
        }
        self.tasks.delete(id).await?;
        // The task's context row cascaded away with it.
        self.cache.bump(self.user_id);
        self.notifier.notify(ChangeEvent::new("deleted", EntityKind::Task, id, self.user_id));
        Ok(())
    }

    pub fn graph(&self) -> &DependencyGraphService {
        &self.graph
    }
}
