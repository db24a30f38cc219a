//! Delegation queue repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Delegation;

#[async_trait]
pub trait DelegationRepository: Send + Sync {
    async fn insert(&self, delegation: &Delegation) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Delegation>>;

    /// Pending delegations in submission order.
    async fn pending(&self) -> DomainResult<Vec<Delegation>>;

    async fn mark_processed(&self, id: Uuid) -> DomainResult<()>;

    async fn record_failure(&self, id: Uuid, attempts: u32, error: &str, terminal: bool) -> DomainResult<()>;

    async fn list(&self) -> DomainResult<Vec<Delegation>>;
}
