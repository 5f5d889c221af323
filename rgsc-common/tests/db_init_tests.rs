//! Tests for database initialization

use rgsc_common::db::init::{
    get_setting_i64, init_database, set_setting, DEFAULT_BATCH_CONCURRENCY,
    DEFAULT_MAX_LOCK_WAIT_MS,
};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("sub").join("rgsc.db");
    assert!(!db_path.exists());

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_all_tables_created() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("rgsc.db")).await.unwrap();

    for table in [
        "settings",
        "songs",
        "charts",
        "scores",
        "personal_bests",
        "sessions",
        "session_score_info",
    ] {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1, "missing table {}", table);
    }
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("rgsc.db")).await.unwrap();

    assert_eq!(
        get_setting_i64(&pool, "db_max_lock_wait_ms", -1).await.unwrap(),
        DEFAULT_MAX_LOCK_WAIT_MS
    );
    assert_eq!(
        get_setting_i64(&pool, "import_batch_concurrency", -1).await.unwrap(),
        DEFAULT_BATCH_CONCURRENCY
    );
    assert_eq!(get_setting_i64(&pool, "no_such_key", 17).await.unwrap(), 17);
}

#[tokio::test]
async fn test_reopen_keeps_changed_settings() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("rgsc.db");

    let pool = init_database(&db_path).await.unwrap();
    set_setting(&pool, "import_batch_concurrency", "3").await.unwrap();
    pool.close().await;

    let reopened = init_database(&db_path).await.unwrap();
    assert_eq!(
        get_setting_i64(&reopened, "import_batch_concurrency", -1).await.unwrap(),
        3
    );
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("rgsc.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO session_score_info \
         (session_id, score_id, is_new_score, score_delta, percent_delta, lamp_delta, grade_delta) \
         VALUES ('missing', 'missing', 1, 0, 0, 0, 0)",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "orphan session_score_info row was accepted");
}
