//! Subtask use cases.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ChangeEvent, EntityKind, Subtask, SubtaskSummary, TaskPriority, TaskStatus,
};
use crate::domain::ports::{ChangeNotifier, SubtaskRepository, TaskRepository};

#[derive(Debug, Clone, Default)]
pub struct CreateSubtaskInput {
    pub task_id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: Option<TaskPriority>,
    pub assignees: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSubtaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignees: Option<Vec<String>>,
    pub progress_percentage: Option<u8>,
}

/// Listing of a task's subtasks with the parent rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskListing {
    pub subtasks: Vec<Subtask>,
    pub summary: SubtaskSummary,
}

#[derive(Clone)]
pub struct SubtaskService {
    user_id: Uuid,
    tasks: Arc<dyn TaskRepository>,
    subtasks: Arc<dyn SubtaskRepository>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl SubtaskService {
    pub fn new(
        user_id: Uuid,
        tasks: Arc<dyn TaskRepository>,
        subtasks: Arc<dyn SubtaskRepository>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self { user_id, tasks, subtasks, notifier }
    }

    pub async fn create(&self, input: CreateSubtaskInput) -> DomainResult<Subtask> {
        self.tasks
            .get(input.task_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Task", input.task_id))?;

        let mut subtask = Subtask::new(self.user_id, input.task_id, input.title, input.description);
        if let Some(priority) = input.priority {
            subtask.priority = priority;
        }
        subtask.assignees = input.assignees;
        subtask.validate().map_err(DomainError::Validation)?;

        self.subtasks.create(&subtask).await?;
        self.notifier.notify(ChangeEvent::new("created", EntityKind::Subtask, subtask.id, self.user_id));
        Ok(subtask)
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<Subtask> {
        self.subtasks
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Subtask", id))
    }

    pub async fn list(&self, task_id: Uuid) -> DomainResult<SubtaskListing> {
        self.tasks
            .get(task_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Task", task_id))?;
        let subtasks = self.subtasks.list_by_task(task_id).await?;
        let summary = SubtaskSummary::from_subtasks(&subtasks);
        Ok(SubtaskListing { subtasks, summary })
    }

    pub async fn update(&self, id: Uuid, patch: UpdateSubtaskInput) -> DomainResult<Subtask> {
        let mut subtask = self.get(id).await?;

        if let Some(title) = patch.title {
            subtask.title = title;
        }
        if let Some(description) = patch.description {
            subtask.description = description;
        }
        if let Some(status) = patch.status {
            subtask.status = status;
            if status == TaskStatus::Done {
                subtask.progress_percentage = 100;
            }
        }
        if let Some(priority) = patch.priority {
            subtask.priority = priority;
        }
        if let Some(assignees) = patch.assignees {
            subtask.assignees = assignees;
        }
        if let Some(progress) = patch.progress_percentage {
            if progress > 100 {
                return Err(DomainError::Validation(format!(
                    "progress_percentage {progress} out of range 0..=100"
                )));
            }
            subtask.progress_percentage = progress;
        }

        subtask.validate().map_err(DomainError::Validation)?;
        subtask.updated_at = Utc::now();
        self.subtasks.update(&subtask).await?;
        self.notifier.notify(ChangeEvent::new("updated", EntityKind::Subtask, id, self.user_id));
        Ok(subtask)
    }

    pub async fn delete(&self, id: Uuid) -> DomainResult<()> {
        self.get(id).await?;
        self.subtasks.delete(id).await?;
        self.notifier.notify(ChangeEvent::new("deleted", EntityKind::Subtask, id, self.user_id));
        Ok(())
    }
}
