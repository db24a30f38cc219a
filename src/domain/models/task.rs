//! Task domain model.
//!
//! Tasks are the unit of agent work. They live under a branch, carry
//! assignees and labels, keep an append-only progress history, and form a
//! per-user dependency DAG.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    Done,
    Cancelled,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "todo" => Some(Self::Todo),
            "in_progress" | "in-progress" => Some(Self::InProgress),
            "blocked" => Some(Self::Blocked),
            "done" | "completed" => Some(Self::Done),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses satisfy dependency gating.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

/// Priority level for tasks and subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "normal" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "urgent" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// One numbered entry in a task's append-only progress history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// 1-based, gapless sequence number.
    pub number: u32,
    pub content: String,
    /// Percentage recorded with this entry, if the caller supplied one.
    pub percentage: Option<u8>,
    pub timestamp: DateTime<Utc>,
}

/// A discrete unit of work under a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// At least one assignee is required at creation.
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
    pub estimated_effort: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// Always within 0..=100.
    pub progress_percentage: u8,
    pub progress_history: Vec<ProgressEntry>,
    /// Task ids this task depends on (loaded from the dependency table).
    pub dependencies: Vec<Uuid>,
    /// Id of the task-tier context row, once one exists.
    pub context_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        user_id: Uuid,
        branch_id: Uuid,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            branch_id,
            user_id,
            title: title.into(),
            description: description.into(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            assignees: Vec::new(),
            labels: Vec::new(),
            estimated_effort: None,
            due_date: None,
            progress_percentage: 0,
            progress_history: Vec::new(),
            dependencies: Vec::new(),
            context_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_assignees(mut self, assignees: Vec<String>) -> Self {
        self.assignees = assignees;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Task title cannot be empty".to_string());
        }
        if self.assignees.is_empty() {
            return Err("Task requires at least one assignee".to_string());
        }
        if self.progress_percentage > 100 {
            return Err(format!(
                "progress_percentage {} out of range 0..=100",
                self.progress_percentage
            ));
        }
        if self.dependencies.contains(&self.id) {
            return Err("Task cannot depend on itself".to_string());
        }
        Ok(())
    }

    /// Set the progress percentage, enforcing the 0..=100 range.
    pub fn set_progress(&mut self, percentage: u8) -> Result<(), String> {
        if percentage > 100 {
            return Err(format!("progress_percentage {percentage} out of range 0..=100"));
        }
        self.progress_percentage = percentage;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Append a numbered progress entry. Numbers run 1..N without gaps.
    /// Returns the entry number.
    pub fn append_progress(&mut self, content: impl Into<String>, percentage: Option<u8>) -> Result<u32, String> {
        if let Some(p) = percentage {
            self.set_progress(p)?;
        }
        let number = self.progress_history.len() as u32 + 1;
        self.progress_history.push(ProgressEntry {
            number,
            content: content.into(),
            percentage,
            timestamp: Utc::now(),
        });
        self.updated_at = Utc::now();
        Ok(number)
    }

    /// Mark the task done and pin progress to 100.
    pub fn complete(&mut self) {
        self.status = TaskStatus::Done;
        self.progress_percentage = 100;
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
