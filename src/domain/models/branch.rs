//! Branch aggregate: a logical workstream under a project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A branch (git branch) holding tasks. Names are unique per project.
///
/// `task_count` and `completed_task_count` are authoritative
/// denormalizations maintained by database triggers and repaired by the
/// counter projector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub task_count: i64,
    pub completed_task_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Branch {
    pub fn new(
        user_id: Uuid,
        project_id: Uuid,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            name: name.into(),
            description: description.into(),
            task_count: 0,
            completed_task_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Branch name cannot be empty".to_string());
        }
        Ok(())
    }

    /// Completion percentage derived from the two counters.
    pub fn progress_percentage(&self) -> f64 {
        if self.task_count == 0 {
            0.0
        } else {
            (self.completed_task_count as f64 / self.task_count as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_handles_empty_branch() {
        let branch = Branch::new(Uuid::new_v4(), Uuid::new_v4(), "main", "");
        assert_eq!(branch.progress_percentage(), 0.0);
    }

    #[test]
    fn progress_is_a_ratio_of_counters() {
        let mut branch = Branch::new(Uuid::new_v4(), Uuid::new_v4(), "main", "");
        branch.task_count = 4;
        branch.completed_task_count = 1;
        assert!((branch.progress_percentage() - 25.0).abs() < f64::EPSILON);
    }
}
