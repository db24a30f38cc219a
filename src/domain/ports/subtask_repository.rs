//! Subtask repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Subtask;

#[async_trait]
pub trait SubtaskRepository: Send + Sync {
    async fn create(&self, subtask: &Subtask) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Subtask>>;

    async fn update(&self, subtask: &Subtask) -> DomainResult<()>;

    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    async fn list_by_task(&self, task_id: Uuid) -> DomainResult<Vec<Subtask>>;
}
