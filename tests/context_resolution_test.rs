//! Four-tier context behavior: inheritance merge, singleton aliasing,
//! ancestor materialization, cache invalidation, and delegation.

mod common;

use serde_json::json;
use uuid::Uuid;

use taskhub::domain::models::{ContextLevel, GLOBAL_SINGLETON};

use common::{seed_project_and_branch, seed_task, setup_test_db, test_registry};

#[tokio::test]
async fn resolve_merges_ancestors_root_first() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let facades = registry.for_user(Uuid::new_v4());
    let (project_id, branch_id) = seed_project_and_branch(&facades).await;
    let task_id = seed_task(&facades, branch_id, "T1").await;

    facades
        .contexts
        .create(
            ContextLevel::Global,
            GLOBAL_SINGLETON,
            json!({"defaults": {"priority": "medium", "lang": "en"}}),
        )
        .await
        .unwrap();
    facades
        .contexts
        .update(ContextLevel::Project, project_id, json!({"defaults": {"lang": "fr"}}))
        .await
        .unwrap();
    // Branch tier: no data written by the caller.
    facades
        .contexts
        .update(ContextLevel::Task, task_id, json!({"owner": "alice"}))
        .await
        .unwrap();

    let resolved = facades.contexts.resolve(ContextLevel::Task, task_id).await.unwrap();
    assert_eq!(
        resolved.data,
        json!({"defaults": {"priority": "medium", "lang": "fr"}, "owner": "alice"})
    );
    assert_eq!(resolved.provenance.get("owner"), Some(&ContextLevel::Task));
    assert_eq!(resolved.provenance.get("defaults"), Some(&ContextLevel::Project));
}

#[tokio::test]
async fn global_alias_resolves_to_per_user_singleton() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

    let f1 = registry.for_user(u1);
    let f2 = registry.for_user(u2);

    f1.contexts
        .create(ContextLevel::Global, GLOBAL_SINGLETON, json!({"org": "acme"}))
        .await
        .unwrap();
    f2.contexts
        .create(ContextLevel::Global, GLOBAL_SINGLETON, json!({"org": "globex"}))
        .await
        .unwrap();

    // Two users share the well-known id but see distinct singletons.
    let g1 = f1.contexts.get(ContextLevel::Global, GLOBAL_SINGLETON, false).await.unwrap();
    let g2 = f2.contexts.get(ContextLevel::Global, GLOBAL_SINGLETON, false).await.unwrap();
    assert_eq!(g1.record.data, json!({"org": "acme"}));
    assert_eq!(g2.record.data, json!({"org": "globex"}));
}

#[tokio::test]
async fn writing_a_task_context_materializes_missing_ancestors() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let facades = registry.for_user(Uuid::new_v4());
    let (project_id, branch_id) = seed_project_and_branch(&facades).await;
    let task_id = seed_task(&facades, branch_id, "T1").await;

    facades
        .contexts
        .create(ContextLevel::Task, task_id, json!({"k": 1}))
        .await
        .unwrap();

    // Every ancestor tier now has a row, created empty.
    for (level, id) in [
        (ContextLevel::Global, GLOBAL_SINGLETON),
        (ContextLevel::Project, project_id),
        (ContextLevel::Branch, branch_id),
    ] {
        let view = facades.contexts.get(level, id, false).await.unwrap();
        assert_eq!(view.record.data, json!({}), "tier {level:?}");
    }

    // And the task row points at its context.
    let task = facades.tasks.get(task_id).await.unwrap();
    assert_eq!(task.task.context_id, Some(task_id));
}

#[tokio::test]
async fn ancestor_write_invalidates_descendant_resolution() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let facades = registry.for_user(Uuid::new_v4());
    let (project_id, branch_id) = seed_project_and_branch(&facades).await;
    let task_id = seed_task(&facades, branch_id, "T1").await;

    facades
        .contexts
        .update(ContextLevel::Project, project_id, json!({"flag": "before"}))
        .await
        .unwrap();
    let before = facades.contexts.resolve(ContextLevel::Task, task_id).await.unwrap();
    assert_eq!(before.data["flag"], "before");

    facades
        .contexts
        .update(ContextLevel::Project, project_id, json!({"flag": "after"}))
        .await
        .unwrap();
    let after = facades.contexts.resolve(ContextLevel::Task, task_id).await.unwrap();
    assert_eq!(after.data["flag"], "after");
}

#[tokio::test]
async fn parent_delete_is_refused_while_children_exist() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let facades = registry.for_user(Uuid::new_v4());
    let (project_id, branch_id) = seed_project_and_branch(&facades).await;

    facades
        .contexts
        .update(ContextLevel::Branch, branch_id, json!({"b": 1}))
        .await
        .unwrap();

    let err = facades
        .contexts
        .delete(ContextLevel::Project, project_id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CONFLICT");

    // Bottom-up succeeds.
    facades.contexts.delete(ContextLevel::Branch, branch_id).await.unwrap();
    facades.contexts.delete(ContextLevel::Project, project_id).await.unwrap();
}

#[tokio::test]
async fn null_update_values_remove_keys_on_resolve() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let facades = registry.for_user(Uuid::new_v4());
    let (project_id, branch_id) = seed_project_and_branch(&facades).await;

    facades
        .contexts
        .update(ContextLevel::Project, project_id, json!({"keep": 1, "drop": 2}))
        .await
        .unwrap();
    facades
        .contexts
        .update(ContextLevel::Branch, branch_id, json!({"drop": null}))
        .await
        .unwrap();

    let resolved = facades.contexts.resolve(ContextLevel::Branch, branch_id).await.unwrap();
    assert_eq!(resolved.data, json!({"keep": 1}));
}

#[tokio::test]
async fn delegations_apply_in_submission_order() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool.clone());
    let user_id = Uuid::new_v4();
    let facades = registry.for_user(user_id);
    let (project_id, branch_id) = seed_project_and_branch(&facades).await;
    let task_id = seed_task(&facades, branch_id, "T1").await;

    facades
        .contexts
        .delegate(ContextLevel::Task, task_id, ContextLevel::Project, json!({"lesson": "first"}))
        .await
        .unwrap();
    facades
        .contexts
        .delegate(ContextLevel::Task, task_id, ContextLevel::Project, json!({"lesson": "second"}))
        .await
        .unwrap();

    // Apply inline through the processor (the queue is a null sink here).
    let cache = std::sync::Arc::new(taskhub::services::InheritanceCache::new(64));
    let notifier: std::sync::Arc<dyn taskhub::domain::ports::ChangeNotifier> =
        std::sync::Arc::new(taskhub::domain::ports::notifier::NullNotifier);
    let processor = taskhub::services::DelegationProcessor::new(pool, cache, notifier, 3);
    let applied = processor.drain_user(user_id).await.unwrap();
    assert_eq!(applied, 2);

    let resolved = facades.contexts.resolve(ContextLevel::Project, project_id).await.unwrap();
    assert_eq!(resolved.data["lesson"], "second");

    let delegations = facades.contexts.list_delegations().await.unwrap();
    assert!(delegations
        .iter()
        .all(|d| d.status == taskhub::domain::models::DelegationStatus::Processed));
}

#[tokio::test]
async fn downward_delegation_is_rejected() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let facades = registry.for_user(Uuid::new_v4());
    let (project_id, _) = seed_project_and_branch(&facades).await;

    let err = facades
        .contexts
        .delegate(ContextLevel::Project, project_id, ContextLevel::Task, json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}
