//! Project use cases.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ChangeEvent, EntityKind, Project};
use crate::domain::ports::{
    AgentRepository, BranchRepository, ChangeNotifier, ProjectRepository, TaskRepository,
};

use super::context::InheritanceCache;
use super::counter_projector::{CounterProjector, RecomputeReport};

/// Per-project audit produced by `project_health_check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectHealthReport {
    pub project_id: Uuid,
    pub branch_count: usize,
    pub task_count: i64,
    pub completed_task_count: i64,
    pub registered_agents: usize,
    pub counter_discrepancies: usize,
    pub healthy: bool,
}

/// User-wide audit produced by `validate_integrity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub projects_checked: usize,
    pub counters: RecomputeReport,
}

#[derive(Clone)]
pub struct ProjectService {
    user_id: Uuid,
    projects: Arc<dyn ProjectRepository>,
    branches: Arc<dyn BranchRepository>,
    tasks: Arc<dyn TaskRepository>,
    agents: Arc<dyn AgentRepository>,
    counters: CounterProjector,
    cache: Arc<InheritanceCache>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl ProjectService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        projects: Arc<dyn ProjectRepository>,
        branches: Arc<dyn BranchRepository>,
        tasks: Arc<dyn TaskRepository>,
        agents: Arc<dyn AgentRepository>,
        counters: CounterProjector,
        cache: Arc<InheritanceCache>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self { user_id, projects, branches, tasks, agents, counters, cache, notifier }
    }

    pub async fn create(&self, name: &str, description: &str) -> DomainResult<Project> {
        let project = Project::new(self.user_id, name.trim(), description);
        project.validate().map_err(DomainError::Validation)?;
        self.projects.create(&project).await?;
        self.notifier.notify(ChangeEvent::new("created", EntityKind::Project, project.id, self.user_id));
        Ok(project)
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<Project> {
        self.projects
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Project", id))
    }

    pub async fn list(&self) -> DomainResult<Vec<Project>> {
        self.projects.list().await
    }

    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> DomainResult<Project> {
        let mut project = self.get(id).await?;
        if let Some(name) = name {
            if let Some(existing) = self.projects.get_by_name(name.trim()).await? {
                if existing.id != id {
                    return Err(DomainError::Conflict(format!(
                        "project name '{}' already exists",
                        name.trim()
                    )));
                }
            }
            project.name = name.trim().to_string();
        }
        if let Some(description) = description {
            project.description = description.to_string();
        }
        project.validate().map_err(DomainError::Validation)?;
        project.updated_at = Utc::now();
        self.projects.update(&project).await?;
        self.notifier.notify(ChangeEvent::new("updated", EntityKind::Project, id, self.user_id));
        Ok(project)
    }

    pub async fn delete(&self, id: Uuid) -> DomainResult<()> {
        self.get(id).await?;
        self.projects.delete(id).await?;
        // Context rows under the project were cascaded away.
        self.cache.bump(self.user_id);
        self.notifier.notify(ChangeEvent::new("deleted", EntityKind::Project, id, self.user_id));
        Ok(())
    }

    pub async fn health_check(&self, id: Uuid) -> DomainResult<ProjectHealthReport> {
        self.get(id).await?;
        let branches = self.branches.list_by_project(id).await?;
        let agents = self.agents.list_by_project(id).await?;
        let drift = self.counters.verify().await?;
        let branch_ids: std::collections::HashSet<Uuid> = branches.iter().map(|b| b.id).collect();
        let counter_discrepancies = drift
            .iter()
            .filter(|d| branch_ids.contains(&d.branch_id))
            .count();

        Ok(ProjectHealthReport {
            project_id: id,
            branch_count: branches.len(),
            task_count: branches.iter().map(|b| b.task_count).sum(),
            completed_task_count: branches.iter().map(|b| b.completed_task_count).sum(),
            registered_agents: agents.len(),
            counter_discrepancies,
            healthy: counter_discrepancies == 0,
        })
    }

    /// Recompute counters across all the user's branches and report drift.
    pub async fn validate_integrity(&self) -> DomainResult<IntegrityReport> {
        let projects = self.projects.list().await?;
        let counters = self.counters.recompute().await?;
        Ok(IntegrityReport { projects_checked: projects.len(), counters })
    }

    /// Delete terminal tasks in this project older than `older_than_days`.
    pub async fn cleanup_obsolete(&self, id: Uuid, older_than_days: i64) -> DomainResult<usize> {
        self.get(id).await?;
        let cutoff = Utc::now() - Duration::days(older_than_days.max(0));

        let deleted = self.tasks.delete_terminal_before(id, cutoff).await?;
        if deleted > 0 {
            // Stale task contexts went with their tasks.
            self.cache.bump(self.user_id);
            self.notifier.notify(ChangeEvent::new("cleaned", EntityKind::Project, id, self.user_id));
        }
        Ok(deleted)
    }
}
