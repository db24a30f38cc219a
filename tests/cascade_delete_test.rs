//! Cascade-aware delete paths: children vanish with their aggregate root.

mod common;

use serde_json::json;
use uuid::Uuid;

use taskhub::domain::models::ContextLevel;
use taskhub::services::subtask_service::CreateSubtaskInput;

use common::{seed_project_and_branch, seed_task, setup_test_db, test_registry};

#[tokio::test]
async fn deleting_a_task_removes_subtasks_and_context() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let facades = registry.for_user(Uuid::new_v4());
    let (_, branch_id) = seed_project_and_branch(&facades).await;
    let task_id = seed_task(&facades, branch_id, "T1").await;

    let subtask = facades
        .subtasks
        .create(CreateSubtaskInput {
            task_id,
            title: "S1".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    facades
        .contexts
        .update(ContextLevel::Task, task_id, json!({"k": 1}))
        .await
        .unwrap();

    facades.tasks.delete(task_id).await.unwrap();

    assert_eq!(facades.tasks.get(task_id).await.unwrap_err().code(), "NOT_FOUND");
    assert_eq!(facades.subtasks.get(subtask.id).await.unwrap_err().code(), "NOT_FOUND");
    assert_eq!(
        facades
            .contexts
            .get(ContextLevel::Task, task_id, false)
            .await
            .unwrap_err()
            .code(),
        "NOT_FOUND"
    );
}

#[tokio::test]
async fn deleting_a_project_cascades_to_the_whole_subtree() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let facades = registry.for_user(Uuid::new_v4());
    let (project_id, branch_id) = seed_project_and_branch(&facades).await;
    let task_id = seed_task(&facades, branch_id, "T1").await;

    let subtask = facades
        .subtasks
        .create(CreateSubtaskInput {
            task_id,
            title: "S1".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    facades
        .contexts
        .update(ContextLevel::Task, task_id, json!({"k": 1}))
        .await
        .unwrap();

    facades.projects.delete(project_id).await.unwrap();

    assert_eq!(facades.projects.get(project_id).await.unwrap_err().code(), "NOT_FOUND");
    assert_eq!(facades.branches.get(branch_id).await.unwrap_err().code(), "NOT_FOUND");
    assert_eq!(facades.tasks.get(task_id).await.unwrap_err().code(), "NOT_FOUND");
    assert_eq!(facades.subtasks.get(subtask.id).await.unwrap_err().code(), "NOT_FOUND");

    for (level, id) in [
        (ContextLevel::Project, project_id),
        (ContextLevel::Branch, branch_id),
        (ContextLevel::Task, task_id),
    ] {
        assert_eq!(
            facades.contexts.get(level, id, false).await.unwrap_err().code(),
            "NOT_FOUND",
            "context tier {level:?} should be gone"
        );
    }
}

#[tokio::test]
async fn deleting_a_branch_cascades_to_its_tasks() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let facades = registry.for_user(Uuid::new_v4());
    let (project_id, branch_id) = seed_project_and_branch(&facades).await;
    let task_id = seed_task(&facades, branch_id, "T1").await;

    facades.branches.delete(branch_id).await.unwrap();

    assert_eq!(facades.tasks.get(task_id).await.unwrap_err().code(), "NOT_FOUND");
    // The project itself survives.
    assert!(facades.projects.get(project_id).await.is_ok());
}

#[tokio::test]
async fn cleanup_obsolete_removes_stale_terminal_tasks_only() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool.clone());
    let facades = registry.for_user(Uuid::new_v4());
    let (project_id, branch_id) = seed_project_and_branch(&facades).await;

    let stale = seed_task(&facades, branch_id, "stale").await;
    let fresh = seed_task(&facades, branch_id, "fresh").await;
    let open = seed_task(&facades, branch_id, "open").await;

    facades.tasks.complete(stale).await.unwrap();
    facades.tasks.complete(fresh).await.unwrap();
    facades
        .contexts
        .update(ContextLevel::Task, stale, json!({"k": 1}))
        .await
        .unwrap();

    // Age one completed task past the cutoff.
    sqlx::query("UPDATE tasks SET updated_at = '2020-01-01T00:00:00+00:00' WHERE id = ?")
        .bind(stale.to_string())
        .execute(&pool)
        .await
        .unwrap();

    let deleted = facades.projects.cleanup_obsolete(project_id, 30).await.unwrap();
    assert_eq!(deleted, 1);

    assert_eq!(facades.tasks.get(stale).await.unwrap_err().code(), "NOT_FOUND");
    assert!(facades.tasks.get(fresh).await.is_ok());
    assert!(facades.tasks.get(open).await.is_ok());

    // The stale task's context row went with it.
    assert_eq!(
        facades
            .contexts
            .get(ContextLevel::Task, stale, false)
            .await
            .unwrap_err()
            .code(),
        "NOT_FOUND"
    );

    // Counters reflect the bulk delete.
    let branch = facades.branches.get(branch_id).await.unwrap();
    assert_eq!(branch.task_count, 2);
    assert_eq!(branch.completed_task_count, 1);
}

#[tokio::test]
async fn branch_name_unique_per_project_but_reusable_across_projects() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let facades = registry.for_user(Uuid::new_v4());

    let p1 = facades.projects.create("P1", "").await.unwrap();
    let p2 = facades.projects.create("P2", "").await.unwrap();

    facades.branches.create(p1.id, "feat", "").await.unwrap();
    let err = facades.branches.create(p1.id, "feat", "").await.unwrap_err();
    assert_eq!(err.code(), "CONFLICT");

    // Same name under a different project is fine.
    facades.branches.create(p2.id, "feat", "").await.unwrap();
}
