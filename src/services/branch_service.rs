//! Branch use cases.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Branch, ChangeEvent, EntityKind};
use crate::domain::ports::{BranchRepository, ChangeNotifier, ProjectRepository};

use super::context::InheritanceCache;

#[derive(Clone)]
pub struct BranchService {
    user_id: Uuid,
    projects: Arc<dyn ProjectRepository>,
    branches: Arc<dyn BranchRepository>,
    cache: Arc<InheritanceCache>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl BranchService {
    pub fn new(
        user_id: Uuid,
        projects: Arc<dyn ProjectRepository>,
        branches: Arc<dyn BranchRepository>,
        cache: Arc<InheritanceCache>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self { user_id, projects, branches, cache, notifier }
    }

    pub async fn create(&self, project_id: Uuid, name: &str, description: &str) -> DomainResult<Branch> {
        self.projects
            .get(project_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Project", project_id))?;

        let branch = Branch::new(self.user_id, project_id, name.trim(), description);
        branch.validate().map_err(DomainError::Validation)?;
        self.branches.create(&branch).await?;
        self.notifier.notify(ChangeEvent::new("created", EntityKind::Branch, branch.id, self.user_id));
        Ok(branch)
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<Branch> {
        self.branches
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Branch", id))
    }

    pub async fn list(&self, project_id: Uuid) -> DomainResult<Vec<Branch>> {
        self.projects
            .get(project_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Project", project_id))?;
        self.branches.list_by_project(project_id).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> DomainResult<Branch> {
        let mut branch = self.get(id).await?;
        if let Some(name) = name {
            if let Some(existing) = self.branches.get_by_name(branch.project_id, name.trim()).await? {
                if existing.id != id {
                    return Err(DomainError::Conflict(format!(
                        "branch name '{}' already exists in project {}",
                        name.trim(),
                        branch.project_id
                    )));
                }
            }
            branch.name = name.trim().to_string();
        }
        if let Some(description) = description {
            branch.description = description.to_string();
        }
        branch.validate().map_err(DomainError::Validation)?;
        branch.updated_at = Utc::now();
        self.branches.update(&branch).await?;
        self.notifier.notify(ChangeEvent::new("updated", EntityKind::Branch, id, self.user_id));
        Ok(branch)
    }

    pub async fn delete(&self, id: Uuid) -> DomainResult<()> {
        self.get(id).await?;
        self.branches.delete(id).await?;
        self.cache.bump(self.user_id);
        self.notifier.notify(ChangeEvent::new("deleted", EntityKind::Branch, id, self.user_id));
        Ok(())
    }
}
