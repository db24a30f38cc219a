//! Per-user isolation: one user's scope never sees another user's rows.

mod common;

use uuid::Uuid;

use common::{seed_project_and_branch, seed_task, setup_test_db, test_registry};

#[tokio::test]
async fn listing_is_scoped_to_the_caller() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

    let f1 = registry.for_user(u1);
    let f2 = registry.for_user(u2);

    let project = f1.projects.create("P1", "").await.unwrap();

    let visible_to_u2 = f2.projects.list().await.unwrap();
    assert!(visible_to_u2.is_empty());

    let visible_to_u1 = f1.projects.list().await.unwrap();
    assert_eq!(visible_to_u1.len(), 1);
    assert_eq!(visible_to_u1[0].id, project.id);
}

#[tokio::test]
async fn cross_user_get_is_not_found() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

    let f1 = registry.for_user(u1);
    let f2 = registry.for_user(u2);

    let project = f1.projects.create("P1", "").await.unwrap();

    let err = f2.projects.get(project.id).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn cross_user_mutation_is_not_found() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

    let f1 = registry.for_user(u1);
    let f2 = registry.for_user(u2);

    let (_, branch_id) = seed_project_and_branch(&f1).await;
    let task_id = seed_task(&f1, branch_id, "T1").await;

    // Neither completing nor deleting another user's task is possible.
    assert_eq!(f2.tasks.complete(task_id).await.unwrap_err().code(), "NOT_FOUND");
    assert_eq!(f2.tasks.delete(task_id).await.unwrap_err().code(), "NOT_FOUND");

    // The owner still sees it untouched.
    let task = f1.tasks.get(task_id).await.unwrap();
    assert_eq!(task.task.status, taskhub::domain::models::TaskStatus::Todo);
}

#[tokio::test]
async fn dependencies_cannot_cross_users() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

    let f1 = registry.for_user(u1);
    let f2 = registry.for_user(u2);

    let (_, b1) = seed_project_and_branch(&f1).await;
    let t1 = seed_task(&f1, b1, "U1 task").await;

    let (_, b2) = seed_project_and_branch(&f2).await;
    let t2 = seed_task(&f2, b2, "U2 task").await;

    // Each side is missing the other's task.
    assert_eq!(
        f1.dependencies.add_dependency(t1, t2).await.unwrap_err().code(),
        "NOT_FOUND"
    );
    assert_eq!(
        f2.dependencies.add_dependency(t2, t1).await.unwrap_err().code(),
        "NOT_FOUND"
    );
}

#[tokio::test]
async fn same_project_name_is_allowed_across_users() {
    let pool = setup_test_db().await;
    let registry = test_registry(pool);

    let f1 = registry.for_user(Uuid::new_v4());
    let f2 = registry.for_user(Uuid::new_v4());

    f1.projects.create("shared-name", "").await.unwrap();
    // Uniqueness is per user, not global.
    f2.projects.create("shared-name", "").await.unwrap();

    // But a second one for the same user conflicts.
    let err = f1.projects.create("shared-name", "").await.unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
}
