//! Migration manager behavior: idempotence and failure retry.

use sqlx::Row;

use taskhub::adapters::sqlite::{create_test_pool, Migrator};

#[tokio::test]
async fn running_twice_applies_nothing_the_second_time() {
    let pool = create_test_pool().await.unwrap();
    let migrator = Migrator::new(pool.clone());

    let first = migrator.run().await.unwrap();
    assert!(first > 0);

    let second = migrator.run().await.unwrap();
    assert_eq!(second, 0);
}

#[tokio::test]
async fn outcomes_are_recorded_in_the_ledger() {
    let pool = create_test_pool().await.unwrap();
    Migrator::new(pool.clone()).run().await.unwrap();

    let rows = sqlx::query("SELECT migration_name, success FROM applied_migrations ORDER BY migration_name")
        .fetch_all(&pool)
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.get::<i64, _>("success"), 1);
    }
    assert_eq!(rows[0].get::<String, _>("migration_name"), "001_initial_schema");
}

#[tokio::test]
async fn clearing_a_failure_record_retries_on_next_run() {
    let pool = create_test_pool().await.unwrap();
    let migrator = Migrator::new(pool.clone());
    migrator.run().await.unwrap();

    // Simulate a previously failed migration.
    sqlx::query(
        "UPDATE applied_migrations SET success = 0 WHERE migration_name = '003_counter_triggers'",
    )
    .execute(&pool)
    .await
    .unwrap();

    // The failed entry is retried (triggers use IF NOT EXISTS, so the
    // replay is harmless) and the ledger heals.
    let applied = migrator.run().await.unwrap();
    assert_eq!(applied, 1);

    let row = sqlx::query(
        "SELECT success FROM applied_migrations WHERE migration_name = '003_counter_triggers'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.get::<i64, _>("success"), 1);
}
