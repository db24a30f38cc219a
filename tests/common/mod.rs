//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sqlx::SqlitePool;
use uuid::Uuid;

use taskhub::adapters::sqlite::{create_test_pool, Migrator};
use taskhub::domain::models::Config;
use taskhub::domain::ports::notifier::NullNotifier;
use taskhub::services::{FacadeRegistry, InheritanceCache, NullDelegationQueue, UserFacades};

/// Fresh in-memory database with all embedded migrations applied.
pub async fn setup_test_db() -> SqlitePool {
    let pool = create_test_pool().await.expect("failed to create test pool");
    Migrator::new(pool.clone())
        .run()
        .await
        .expect("failed to run migrations");
    pool
}

/// Facade registry wired against the test pool, with delegation applied
/// inline (no background worker) and notifications dropped.
pub fn test_registry(pool: SqlitePool) -> Arc<FacadeRegistry> {
    let config = Arc::new(Config::default());
    let cache = Arc::new(InheritanceCache::new(config.cache.inheritance_capacity));
    Arc::new(FacadeRegistry::new(
        pool,
        config,
        cache,
        Arc::new(NullDelegationQueue),
        Arc::new(NullNotifier),
    ))
}

pub fn facades_for(registry: &FacadeRegistry, user_id: Uuid) -> Arc<UserFacades> {
    registry.for_user(user_id)
}

/// Project -> branch scaffolding most tests start from.
pub async fn seed_project_and_branch(facades: &UserFacades) -> (Uuid, Uuid) {
    let project = facades
        .projects
        .create("P1", "test project")
        .await
        .expect("failed to create project");
    let branch = facades
        .branches
        .create(project.id, "main", "mainline")
        .await
        .expect("failed to create branch");
    (project.id, branch.id)
}

pub async fn seed_task(facades: &UserFacades, branch_id: Uuid, title: &str) -> Uuid {
    let task = facades
        .tasks
        .create(taskhub::services::task_service::CreateTaskInput {
            branch_id,
            title: title.to_string(),
            description: String::new(),
            assignees: vec!["coding-agent".to_string()],
            ..Default::default()
        })
        .await
        .expect("failed to create task");
    task.id
}
