//! Project repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Project;

/// Repository interface for Project persistence. Implementations are bound
/// to a user scope; every query filters on the bound `user_id` and every
/// write stamps it.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: &Project) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Project>>;

    async fn get_by_name(&self, name: &str) -> DomainResult<Option<Project>>;

    async fn list(&self) -> DomainResult<Vec<Project>>;

    async fn update(&self, project: &Project) -> DomainResult<()>;

    /// Delete the project. Branches, tasks, subtasks, and their contexts go
    /// with it in the same transaction.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
}
