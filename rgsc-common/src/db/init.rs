//! Database initialization
//!
//! Creates the SQLite file on first run, applies pragmas and creates every
//! table with `CREATE TABLE IF NOT EXISTS`, so it is safe to call on each
//! startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Default for `db_max_lock_wait_ms`
pub const DEFAULT_MAX_LOCK_WAIT_MS: i64 = 5000;

/// Default for `import_batch_concurrency`
pub const DEFAULT_BATCH_CONCURRENCY: i64 = 8;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas go on the connect options so every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        // WAL lets imports for different pairs read while one writer commits
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(250));

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_songs_table(pool).await?;
    create_charts_table(pool).await?;
    create_scores_table(pool).await?;
    create_personal_bests_table(pool).await?;
    create_sessions_table(pool).await?;
    create_session_score_info_table(pool).await?;
    Ok(())
}

/// Create the settings table
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            game TEXT NOT NULL,
            id INTEGER NOT NULL,
            title TEXT NOT NULL,
            artist TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (game, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_title ON songs(game, title)")
        .execute(pool)
        .await?;

    Ok(())
}

// song_id is not a foreign key: the catalog is maintained externally and a
// dangling song_id surfaces as a desync at validation time.
async fn create_charts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS charts (
            chart_id TEXT PRIMARY KEY,
            song_id INTEGER NOT NULL,
            game TEXT NOT NULL,
            playtype TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            level TEXT NOT NULL,
            level_num REAL NOT NULL DEFAULT 0,
            in_game_id INTEGER,
            is_primary INTEGER NOT NULL DEFAULT 1,
            data TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_charts_in_game_id ON charts(game, playtype, in_game_id, difficulty)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_charts_song ON charts(game, song_id, playtype, difficulty)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_scores_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scores (
            score_id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            chart_id TEXT NOT NULL,
            song_id INTEGER NOT NULL,
            game TEXT NOT NULL,
            playtype TEXT NOT NULL,
            score REAL NOT NULL,
            percent REAL NOT NULL,
            lamp TEXT NOT NULL,
            lamp_index INTEGER NOT NULL,
            grade TEXT NOT NULL,
            grade_index INTEGER NOT NULL,
            optional TEXT NOT NULL DEFAULT '{}',
            gauge_history TEXT,
            time_achieved INTEGER,
            time_added INTEGER NOT NULL,
            service TEXT NOT NULL,
            import_type TEXT NOT NULL,
            calculated TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_scores_user_chart ON scores(user_id, chart_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_personal_bests_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS personal_bests (
            user_id INTEGER NOT NULL,
            chart_id TEXT NOT NULL,
            song_id INTEGER NOT NULL,
            game TEXT NOT NULL,
            playtype TEXT NOT NULL,
            score REAL NOT NULL,
            percent REAL NOT NULL,
            grade TEXT NOT NULL,
            grade_index INTEGER NOT NULL,
            lamp TEXT NOT NULL,
            lamp_index INTEGER NOT NULL,
            optional TEXT NOT NULL DEFAULT '{}',
            gauge_history TEXT,
            calculated TEXT NOT NULL DEFAULT '{}',
            composed_from TEXT NOT NULL,
            time_achieved INTEGER,
            PRIMARY KEY (user_id, chart_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_personal_bests_chart_percent ON personal_bests(chart_id, percent)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            game TEXT NOT NULL,
            playtype TEXT NOT NULL,
            name TEXT NOT NULL,
            time_started INTEGER NOT NULL,
            time_ended INTEGER,
            calculated TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id, game, playtype, time_started)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_session_score_info_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_score_info (
            session_id TEXT NOT NULL REFERENCES sessions(session_id) ON DELETE CASCADE,
            score_id TEXT NOT NULL REFERENCES scores(score_id) ON DELETE CASCADE,
            is_new_score INTEGER NOT NULL,
            score_delta REAL NOT NULL,
            percent_delta REAL NOT NULL,
            lamp_delta INTEGER NOT NULL,
            grade_delta INTEGER NOT NULL,
            PRIMARY KEY (session_id, score_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize default settings, leaving existing values alone
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "db_max_lock_wait_ms", &DEFAULT_MAX_LOCK_WAIT_MS.to_string()).await?;
    ensure_setting(
        pool,
        "import_batch_concurrency",
        &DEFAULT_BATCH_CONCURRENCY.to_string(),
    )
    .await?;

    debug!("Default settings initialized");
    Ok(())
}

async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value WHERE settings.value IS NULL
        "#,
    )
    .bind(key)
    .bind(default_value)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        info!("Initialized setting '{}' with default value: {}", key, default_value);
    }

    Ok(())
}

/// Read an integer setting, falling back to `default` when absent or unparsable
pub async fn get_setting_i64(pool: &SqlitePool, key: &str, default: i64) -> Result<i64> {
    let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(value
        .flatten()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default))
}

/// Write a setting
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}
