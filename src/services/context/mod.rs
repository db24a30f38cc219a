//! Unified context service: four-tier hierarchy with inheritance,
//! delegation, and caching.

pub mod delegation_worker;
pub mod inheritance_cache;
pub mod merge;

use std::sync::Arc;

use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{
    SqliteBranchRepository, SqliteContextRepository, SqliteDelegationRepository,
    SqliteProjectRepository, SqliteTaskRepository,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ensure_map, ChangeEvent, ContextLevel, ContextRecord, Delegation, EntityKind,
    ResolvedContext, GLOBAL_SINGLETON,
};
use crate::domain::ports::{
    BranchRepository, ChangeNotifier, ContextRepository, DelegationRepository,
    ProjectRepository, TaskRepository,
};

pub use delegation_worker::DelegationProcessor;
pub use inheritance_cache::InheritanceCache;

/// Hand-off point between the synchronous delegate call and the per-user
/// background application worker.
pub trait DelegationQueue: Send + Sync {
    /// Nudge the worker for a user; must not block.
    fn submit(&self, user_id: Uuid);
}

/// Queue that drops nudges. Used by the worker itself and in tests where
/// delegations are applied inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDelegationQueue;

impl DelegationQueue for NullDelegationQueue {
    fn submit(&self, _user_id: Uuid) {}
}

/// A stored row together with its optional resolved overlay.
#[derive(Debug, Clone)]
pub struct ContextView {
    pub record: ContextRecord,
    pub resolved: Option<Arc<ResolvedContext>>,
}

#[derive(Clone)]
pub struct UnifiedContextService {
    user_id: Uuid,
    contexts: Arc<dyn ContextRepository>,
    delegations: Arc<dyn DelegationRepository>,
    projects: Arc<dyn ProjectRepository>,
    branches: Arc<dyn BranchRepository>,
    tasks: Arc<dyn TaskRepository>,
    cache: Arc<InheritanceCache>,
    queue: Arc<dyn DelegationQueue>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl UnifiedContextService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        contexts: Arc<dyn ContextRepository>,
        delegations: Arc<dyn DelegationRepository>,
        projects: Arc<dyn ProjectRepository>,
        branches: Arc<dyn BranchRepository>,
        tasks: Arc<dyn TaskRepository>,
        cache: Arc<InheritanceCache>,
        queue: Arc<dyn DelegationQueue>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self { user_id, contexts, delegations, projects, branches, tasks, cache, queue, notifier }
    }

    /// Build a user-scoped service straight from a pool. Used by the
    /// facade registry and the delegation worker.
    pub fn for_user(
        pool: SqlitePool,
        user_id: Uuid,
        cache: Arc<InheritanceCache>,
        queue: Arc<dyn DelegationQueue>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self::new(
            user_id,
            Arc::new(SqliteContextRepository::new(pool.clone()).with_user(user_id)),
            Arc::new(SqliteDelegationRepository::new(pool.clone()).with_user(user_id)),
            Arc::new(SqliteProjectRepository::new(pool.clone()).with_user(user_id)),
            Arc::new(SqliteBranchRepository::new(pool.clone()).with_user(user_id)),
            Arc::new(SqliteTaskRepository::new(pool).with_user(user_id)),
            cache,
            queue,
            notifier,
        )
    }

    /// Root-first chain of `(tier, context id)` pairs from the global
    /// singleton down to the given context, derived from the entity tree.
    /// Fails `NOT_FOUND` when the owning entity does not exist in scope.
    pub(crate) async fn entity_chain(
        &self,
        level: ContextLevel,
        id: Uuid,
    ) -> DomainResult<Vec<(ContextLevel, Uuid)>> {
        match level {
            ContextLevel::Global => {
                if id != GLOBAL_SINGLETON {
                    return Err(DomainError::invalid_format("context_id", id.to_string()));
                }
                Ok(vec![(ContextLevel::Global, GLOBAL_SINGLETON)])
            }
            ContextLevel::Project => {
                self.projects
                    .get(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Project", id))?;
                Ok(vec![(ContextLevel::Global, GLOBAL_SINGLETON), (ContextLevel::Project, id)])
            }
            ContextLevel::Branch => {
                let branch = self
                    .branches
                    .get(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Branch", id))?;
                let mut chain = Box::pin(self.entity_chain(ContextLevel::Project, branch.project_id)).await?;
                chain.push((ContextLevel::Branch, id));
                Ok(chain)
            }
            ContextLevel::Task => {
                let task = self
                    .tasks
                    .get(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Task", id))?;
                let mut chain = Box::pin(self.entity_chain(ContextLevel::Branch, task.branch_id)).await?;
                chain.push((ContextLevel::Task, id));
                Ok(chain)
            }
        }
    }

    /// Materialize missing ancestor rows root-first. Returns the parent id
    /// for the target tier (`None` at the global tier).
    async fn ensure_parents(&self, chain: &[(ContextLevel, Uuid)]) -> DomainResult<Option<Uuid>> {
        let mut parent_id: Option<Uuid> = None;
        for (level, id) in &chain[..chain.len() - 1] {
            if self.contexts.get(*level, *id).await?.is_none() {
                let record = ContextRecord::new(
                    self.user_id,
                    *level,
                    *id,
                    parent_id,
                    Value::Null,
                );
                self.contexts.insert(&record).await?;
            }
            parent_id = Some(*id);
        }
        Ok(parent_id)
    }

    /// Create a context row, transparently materializing missing ancestors.
    pub async fn create(&self, level: ContextLevel, id: Uuid, data: Value) -> DomainResult<ContextRecord> {
        if self.contexts.get(level, id).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "{} context {id} already exists",
                level.as_str()
            )));
        }

        let chain = self.entity_chain(level, id).await?;
        let parent_id = self.ensure_parents(&chain).await?;

        let record = ContextRecord::new(self.user_id, level, id, parent_id, ensure_map(data));
        self.contexts.insert(&record).await?;

        if level == ContextLevel::Task {
            self.link_task_context(id).await?;
        }

        self.cache.bump(self.user_id);
        self.notifier.notify(ChangeEvent::new("created", EntityKind::Context, id, self.user_id));
        Ok(record)
    }

    pub async fn get(
        &self,
        level: ContextLevel,
        id: Uuid,
        include_inherited: bool,
    ) -> DomainResult<ContextView> {
        let record = self
            .contexts
            .get(level, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Context", id))?;

        let resolved = if include_inherited {
            Some(self.resolve(level, id).await?)
        } else {
            None
        };

        Ok(ContextView { record, resolved })
    }

    /// Merge `data` into the stored blob, last-writer-wins per top-level
    /// key. Rows are lazily created on first write.
    pub async fn update(&self, level: ContextLevel, id: Uuid, data: Value) -> DomainResult<ContextRecord> {
        let data = ensure_map(data);
        let Some(mut record) = self.contexts.get(level, id).await? else {
            return self.create(level, id, data).await;
        };

        merge::merge_update(&mut record.data, &data);
        self.contexts.update_data(level, id, &record.data).await?;

        self.cache.bump(self.user_id);
        self.notifier.notify(ChangeEvent::new("updated", EntityKind::Context, id, self.user_id));
        Ok(record)
    }

    /// Delete a row. Refused while child-tier rows exist; entity delete
    /// paths cascade contexts themselves.
    pub async fn delete(&self, level: ContextLevel, id: Uuid) -> DomainResult<()> {
        let children = self.contexts.children_of(level, id).await?;
        if !children.is_empty() {
            return Err(DomainError::Conflict(format!(
                "{} context {id} still has {} child context(s)",
                level.as_str(),
                children.len()
            )));
        }

        self.contexts.delete(level, id).await?;

        if level == ContextLevel::Task {
            self.unlink_task_context(id).await?;
        }

        self.cache.bump(self.user_id);
        self.notifier.notify(ChangeEvent::new("deleted", EntityKind::Context, id, self.user_id));
        Ok(())
    }

    /// Resolve the effective context by folding the ancestor chain.
    pub async fn resolve(&self, level: ContextLevel, id: Uuid) -> DomainResult<Arc<ResolvedContext>> {
        let version = self.cache.version(self.user_id);
        if let Some(hit) = self.cache.get(self.user_id, level, id, version) {
            return Ok(hit);
        }

        let chain = self.entity_chain(level, id).await?;
        let mut layers = Vec::with_capacity(chain.len());
        let mut inheritance_chain = Vec::new();
        for (tier, context_id) in &chain {
            if let Some(row) = self.contexts.get(*tier, *context_id).await? {
                layers.push((*tier, row.data));
                inheritance_chain.push(*tier);
            }
        }

        let (data, provenance) = merge::fold_layers(&layers);
        let resolved = Arc::new(ResolvedContext {
            level,
            context_id: id,
            data,
            provenance,
            inheritance_chain,
        });

        self.cache.insert(self.user_id, level, id, version, resolved.clone());
        Ok(resolved)
    }

    /// Append a delegation and nudge the per-user worker.
    pub async fn delegate(
        &self,
        source_level: ContextLevel,
        source_id: Uuid,
        target_level: ContextLevel,
        payload: Value,
    ) -> DomainResult<Delegation> {
        // The source entity must exist; the context row itself may not.
        self.entity_chain(source_level, source_id).await?;

        let delegation = Delegation::new(self.user_id, source_level, source_id, target_level, payload);
        delegation.validate().map_err(DomainError::Validation)?;

        self.delegations.insert(&delegation).await?;
        self.queue.submit(self.user_id);
        self.notifier.notify(ChangeEvent::new(
            "queued",
            EntityKind::Delegation,
            delegation.id,
            self.user_id,
        ));
        Ok(delegation)
    }

    pub async fn list_delegations(&self) -> DomainResult<Vec<Delegation>> {
        self.delegations.list().await
    }

    /// Apply one delegation inline: merge its payload into the source's
    /// ancestor context at the target tier. Called by the worker.
    pub async fn apply_delegation(&self, delegation: &Delegation) -> DomainResult<ContextRecord> {
        let chain = self.entity_chain(delegation.source_level, delegation.source_id).await?;
        let (_, target_id) = chain
            .iter()
            .find(|(tier, _)| *tier == delegation.target_level)
            .copied()
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "no {} ancestor for {} context {}",
                    delegation.target_level.as_str(),
                    delegation.source_level.as_str(),
                    delegation.source_id
                ))
            })?;

        self.update(delegation.target_level, target_id, delegation.payload.clone()).await
    }

    async fn link_task_context(&self, task_id: Uuid) -> DomainResult<()> {
        if let Some(mut task) = self.tasks.get(task_id).await? {
            task.context_id = Some(task_id);
            self.tasks.update(&task).await?;
        }
        Ok(())
    }

    async fn unlink_task_context(&self, task_id: Uuid) -> DomainResult<()> {
        if let Some(mut task) = self.tasks.get(task_id).await? {
            task.context_id = None;
            self.tasks.update(&task).await?;
        }
        Ok(())
    }
}
