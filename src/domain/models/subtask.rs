//! Subtask model: a child work item owned by a task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{TaskPriority, TaskStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignees: Vec<String>,
    pub progress_percentage: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subtask {
    pub fn new(
        user_id: Uuid,
        task_id: Uuid,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            task_id,
            user_id,
            title: title.into(),
            description: description.into(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            assignees: Vec::new(),
            progress_percentage: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Subtask title cannot be empty".to_string());
        }
        if self.progress_percentage > 100 {
            return Err(format!(
                "progress_percentage {} out of range 0..=100",
                self.progress_percentage
            ));
        }
        Ok(())
    }
}

/// Read-side rollup over a task's subtasks. Never mutates the parent task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtaskSummary {
    pub total: usize,
    pub done: usize,
    pub in_progress: usize,
    pub todo: usize,
    pub blocked: usize,
    pub cancelled: usize,
    pub average_progress: f64,
}

impl SubtaskSummary {
    pub fn from_subtasks(subtasks: &[Subtask]) -> Self {
        let mut summary = Self { total: subtasks.len(), ..Self::default() };
        for s in subtasks {
            match s.status {
                TaskStatus::Done => summary.done += 1,
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::Todo => summary.todo += 1,
                TaskStatus::Blocked => summary.blocked += 1,
                TaskStatus::Cancelled => summary.cancelled += 1,
            }
        }
        if !subtasks.is_empty() {
            let sum: u32 = subtasks.iter().map(|s| u32::from(s.progress_percentage)).sum();
            summary.average_progress = f64::from(sum) / subtasks.len() as f64;
        }
        summary
    }

    /// Open subtasks block a clean completion of the parent.
    pub fn open_count(&self) -> usize {
        self.todo + self.in_progress + self.blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subtask(status: TaskStatus, progress: u8) -> Subtask {
        let mut s = Subtask::new(Uuid::new_v4(), Uuid::new_v4(), "s", "");
        s.status = status;
        s.progress_percentage = progress;
        s
    }

    #[test]
    fn summary_counts_by_status() {
        let subtasks = vec![
            subtask(TaskStatus::Done, 100),
            subtask(TaskStatus::Todo, 0),
            subtask(TaskStatus::InProgress, 50),
        ];
        let summary = SubtaskSummary::from_subtasks(&subtasks);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.done, 1);
        assert_eq!(summary.open_count(), 2);
        assert!((summary.average_progress - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_summary_is_zeroed() {
        let summary = SubtaskSummary::from_subtasks(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_progress, 0.0);
    }
}
