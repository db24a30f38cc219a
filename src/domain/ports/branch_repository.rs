//! Branch repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Branch;

/// One branch whose stored counters disagree with the actual task rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterDrift {
    pub branch_id: Uuid,
    pub stored_task_count: i64,
    pub actual_task_count: i64,
    pub stored_completed_count: i64,
    pub actual_completed_count: i64,
}

#[async_trait]
pub trait BranchRepository: Send + Sync {
    async fn create(&self, branch: &Branch) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Branch>>;

    async fn get_by_name(&self, project_id: Uuid, name: &str) -> DomainResult<Option<Branch>>;

    async fn list_by_project(&self, project_id: Uuid) -> DomainResult<Vec<Branch>>;

    async fn update(&self, branch: &Branch) -> DomainResult<()>;

    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// Report branches whose denormalized counters drifted from the task
    /// table. Used by the self-heal path; an empty result means the trigger
    /// projection is healthy.
    async fn counter_drift(&self) -> DomainResult<Vec<CounterDrift>>;

    /// Recompute counters for every branch in scope, returning how many rows
    /// were corrected.
    async fn recompute_counters(&self) -> DomainResult<usize>;
}
