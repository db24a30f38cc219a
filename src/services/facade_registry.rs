//! User-scoped facade bundles.
//!
//! The dispatcher talks to exactly one object per request: the facade
//! bundle for the authenticated user. Building one wires every repository
//! to the user scope, so bundles are cached per user and rebuilt after the
//! configured TTL, on sign-out, and on schema migration.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{
    SqliteAgentRepository, SqliteBranchRepository, SqliteDependencyRepository,
    SqliteProjectRepository, SqliteSubtaskRepository, SqliteTaskRepository,
};
use crate::domain::models::Config;
use crate::domain::ports::ChangeNotifier;

use super::agent_service::AgentService;
use super::branch_service::BranchService;
use super::context::{DelegationQueue, InheritanceCache, UnifiedContextService};
use super::counter_projector::CounterProjector;
use super::dependency_graph::DependencyGraphService;
use super::project_service::ProjectService;
use super::subtask_service::SubtaskService;
use super::task_service::TaskService;

/// Everything a controller needs, scoped to one user.
pub struct UserFacades {
    pub user_id: Uuid,
    pub projects: ProjectService,
    pub branches: BranchService,
    pub tasks: TaskService,
    pub subtasks: SubtaskService,
    pub agents: AgentService,
    pub contexts: UnifiedContextService,
    pub dependencies: DependencyGraphService,
    pub counters: CounterProjector,
}

pub struct FacadeRegistry {
    pool: SqlitePool,
    config: Arc<Config>,
    cache: Arc<InheritanceCache>,
    queue: Arc<dyn DelegationQueue>,
    notifier: Arc<dyn ChangeNotifier>,
    entries: Mutex<HashMap<Uuid, (Instant, Arc<UserFacades>)>>,
}

impl FacadeRegistry {
    pub fn new(
        pool: SqlitePool,
        config: Arc<Config>,
        cache: Arc<InheritanceCache>,
        queue: Arc<dyn DelegationQueue>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self { pool, config, cache, queue, notifier, entries: Mutex::new(HashMap::new()) }
    }

    /// The facade bundle for a user. The user id is mandatory by
    /// construction; there is no anonymous or fallback bundle.
    pub fn for_user(&self, user_id: Uuid) -> Arc<UserFacades> {
        let ttl = Duration::from_secs(self.config.cache.facade_ttl_secs);
        let mut entries = self.entries.lock().expect("facade lock poisoned");

        if let Some((built_at, facades)) = entries.get(&user_id) {
            if built_at.elapsed() < ttl {
                return facades.clone();
            }
        }

        let facades = Arc::new(self.build(user_id));
        entries.insert(user_id, (Instant::now(), facades.clone()));
        facades
    }

    pub fn invalidate(&self, user_id: Uuid) {
        self.entries.lock().expect("facade lock poisoned").remove(&user_id);
    }

    /// Drop every cached bundle (sign-out-all, schema migration).
    pub fn clear(&self) {
        self.entries.lock().expect("facade lock poisoned").clear();
    }

    fn build(&self, user_id: Uuid) -> UserFacades {
        let pool = self.pool.clone();

        let projects: Arc<SqliteProjectRepository> =
            Arc::new(SqliteProjectRepository::new(pool.clone()).with_user(user_id));
        let branches: Arc<SqliteBranchRepository> =
            Arc::new(SqliteBranchRepository::new(pool.clone()).with_user(user_id));
        let tasks: Arc<SqliteTaskRepository> =
            Arc::new(SqliteTaskRepository::new(pool.clone()).with_user(user_id));
        let subtasks: Arc<SqliteSubtaskRepository> =
            Arc::new(SqliteSubtaskRepository::new(pool.clone()).with_user(user_id));
        let agents: Arc<SqliteAgentRepository> =
            Arc::new(SqliteAgentRepository::new(pool.clone()).with_user(user_id));
        let edges: Arc<SqliteDependencyRepository> =
            Arc::new(SqliteDependencyRepository::new(pool.clone()).with_user(user_id));

        let graph = DependencyGraphService::new(
            tasks.clone(),
            edges,
            self.config.limits.max_dependency_edges,
        );
        let counters = CounterProjector::new(branches.clone());

        UserFacades {
            user_id,
            projects: ProjectService::new(
                user_id,
                projects.clone(),
                branches.clone(),
                tasks.clone(),
                agents.clone(),
                counters.clone(),
                self.cache.clone(),
                self.notifier.clone(),
            ),
            branches: BranchService::new(
                user_id,
                projects.clone(),
                branches.clone(),
                self.cache.clone(),
                self.notifier.clone(),
            ),
            tasks: TaskService::new(
                user_id,
                tasks.clone(),
                branches.clone(),
                subtasks.clone(),
                graph.clone(),
                self.cache.clone(),
                self.notifier.clone(),
            ),
            subtasks: SubtaskService::new(user_id, tasks, subtasks, self.notifier.clone()),
            agents: AgentService::new(user_id, agents, branches.clone(), self.notifier.clone()),
            contexts: UnifiedContextService::for_user(
                pool,
                user_id,
                self.cache.clone(),
                self.queue.clone(),
                self.notifier.clone(),
            ),
            dependencies: graph,
            counters,
        }
    }
}
