//! Dependency edge repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;

/// Directed edge `task → depends_on` within one user's graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub task_id: Uuid,
    pub depends_on_id: Uuid,
}

#[async_trait]
pub trait DependencyRepository: Send + Sync {
    async fn add(&self, task_id: Uuid, depends_on_id: Uuid) -> DomainResult<()>;

    async fn remove(&self, task_id: Uuid, depends_on_id: Uuid) -> DomainResult<()>;

    async fn clear_for_task(&self, task_id: Uuid) -> DomainResult<usize>;

    /// Direct predecessors of a task.
    async fn dependencies_of(&self, task_id: Uuid) -> DomainResult<Vec<Uuid>>;

    /// Direct successors of a task.
    async fn dependents_of(&self, task_id: Uuid) -> DomainResult<Vec<Uuid>>;

    /// Every edge in the bound user's graph; cycle checks walk this set.
    async fn all_edges(&self) -> DomainResult<Vec<DependencyEdge>>;

    async fn count(&self) -> DomainResult<usize>;
}
