//! Branch counter projection: triggers keep counts exact after every
//! committed write, and the self-heal path repairs manual drift.

mod common;

use uuid::Uuid;

use common::{seed_project_and_branch, seed_task, setup_test_db, test_registry};

#[tokio::test]
async fn counters_follow_task_lifecycle() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let facades = registry.for_user(Uuid::new_v4());
    let (_, branch_id) = seed_project_and_branch(&facades).await;

    let branch = facades.branches.get(branch_id).await.unwrap();
    assert_eq!(branch.task_count, 0);
    assert_eq!(branch.completed_task_count, 0);

    let task_id = seed_task(&facades, branch_id, "T1").await;

    let branch = facades.branches.get(branch_id).await.unwrap();
    assert_eq!(branch.task_count, 1);
    assert_eq!(branch.completed_task_count, 0);

    facades.tasks.complete(task_id).await.unwrap();

    let branch = facades.branches.get(branch_id).await.unwrap();
    assert_eq!(branch.task_count, 1);
    assert_eq!(branch.completed_task_count, 1);

    facades.tasks.delete(task_id).await.unwrap();

    let branch = facades.branches.get(branch_id).await.unwrap();
    assert_eq!(branch.task_count, 0);
    assert_eq!(branch.completed_task_count, 0);
}

#[tokio::test]
async fn cancelled_tasks_count_as_tasks_but_not_completed() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let facades = registry.for_user(Uuid::new_v4());
    let (_, branch_id) = seed_project_and_branch(&facades).await;

    let task_id = seed_task(&facades, branch_id, "T1").await;
    facades
        .tasks
        .update(
            task_id,
            taskhub::services::task_service::UpdateTaskInput {
                status: Some(taskhub::domain::models::TaskStatus::Cancelled),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let branch = facades.branches.get(branch_id).await.unwrap();
    assert_eq!(branch.task_count, 1);
    assert_eq!(branch.completed_task_count, 0);
}

#[tokio::test]
async fn recompute_repairs_manual_drift() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool.clone());
    let user_id = Uuid::new_v4();
    let facades = registry.for_user(user_id);
    let (_, branch_id) = seed_project_and_branch(&facades).await;
    seed_task(&facades, branch_id, "T1").await;
    seed_task(&facades, branch_id, "T2").await;

    // Corrupt the denormalization behind the triggers' back.
    sqlx::query("UPDATE branches SET task_count = 99, completed_task_count = 7 WHERE id = ?")
        .bind(branch_id.to_string())
        .execute(&pool)
        .await
        .unwrap();

    let report = facades.counters.recompute().await.unwrap();
    assert_eq!(report.corrected_branches, 1);
    assert_eq!(report.discrepancies.len(), 1);
    assert_eq!(report.discrepancies[0].stored_task_count, 99);
    assert_eq!(report.discrepancies[0].actual_task_count, 2);

    let branch = facades.branches.get(branch_id).await.unwrap();
    assert_eq!(branch.task_count, 2);
    assert_eq!(branch.completed_task_count, 0);

    // A clean projection verifies as empty.
    assert!(facades.counters.verify().await.unwrap().is_empty());
}
