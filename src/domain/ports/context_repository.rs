//! Context repository port.
//!
//! One contract serves all four tiers; the tier travels with every call.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ContextLevel, ContextRecord};

#[async_trait]
pub trait ContextRepository: Send + Sync {
    async fn insert(&self, record: &ContextRecord) -> DomainResult<()>;

    async fn get(&self, level: ContextLevel, id: Uuid) -> DomainResult<Option<ContextRecord>>;

    /// Replace the stored data blob (merge happens in the service).
    async fn update_data(
        &self,
        level: ContextLevel,
        id: Uuid,
        data: &serde_json::Value,
    ) -> DomainResult<()>;

    async fn delete(&self, level: ContextLevel, id: Uuid) -> DomainResult<()>;

    /// Stored child-tier rows pointing at this row. Parent deletion is
    /// refused while any exist.
    async fn children_of(&self, level: ContextLevel, id: Uuid) -> DomainResult<Vec<ContextRecord>>;

    /// Walk `parent_id` links from the given row up to the global tier,
    /// returning the stored rows root first (missing tiers are skipped).
    async fn find_ancestors(&self, level: ContextLevel, id: Uuid) -> DomainResult<Vec<ContextRecord>>;
}
