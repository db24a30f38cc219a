//! Agent registry and assignment repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Agent, AgentAssignment};

#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Insert or refresh a registered agent (id collision means the same
    /// derived agent; the description wins last-writer).
    async fn register(&self, agent: &Agent) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Agent>>;

    async fn get_by_name(&self, project_id: Uuid, name: &str) -> DomainResult<Option<Agent>>;

    async fn list_by_project(&self, project_id: Uuid) -> DomainResult<Vec<Agent>>;

    /// All registered agents with this canonical name across the bound
    /// user's projects. `call_agent` resolves names through this.
    async fn find_by_name(&self, name: &str) -> DomainResult<Vec<Agent>>;

    async fn unregister(&self, id: Uuid) -> DomainResult<()>;

    async fn assign(&self, assignment: &AgentAssignment) -> DomainResult<()>;

    async fn unassign(&self, branch_id: Uuid, agent_id: Uuid) -> DomainResult<()>;

    async fn assignments_for_branch(&self, branch_id: Uuid) -> DomainResult<Vec<AgentAssignment>>;

    async fn assignments_for_project(&self, project_id: Uuid) -> DomainResult<Vec<AgentAssignment>>;

    /// Drop every assignment in the project; rebalancing starts from a
    /// clean slate.
    async fn clear_project_assignments(&self, project_id: Uuid) -> DomainResult<usize>;
}
