//! Session and session score info storage

use super::{json_column, parsed_column, to_json};
use rgsc_common::db::{Session, SessionScoreInfo};
use rgsc_common::{Error, Game, Playtype, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;

const SESSION_COLUMNS: &str =
    "session_id, user_id, game, playtype, name, time_started, time_ended, calculated";

const INFO_COLUMNS: &str =
    "score_id, is_new_score, score_delta, percent_delta, lamp_delta, grade_delta";

fn session_from_row(row: &SqliteRow) -> Result<Session> {
    let session_id: String = row.try_get("session_id")?;
    let session_id = Uuid::parse_str(&session_id)
        .map_err(|e| Error::Internal(format!("Invalid session_id {}: {}", session_id, e)))?;

    Ok(Session {
        session_id,
        user_id: row.try_get("user_id")?,
        game: parsed_column(row, "game")?,
        playtype: parsed_column(row, "playtype")?,
        name: row.try_get("name")?,
        time_started: row.try_get("time_started")?,
        time_ended: row.try_get("time_ended")?,
        calculated: json_column(row, "calculated")?,
    })
}

fn score_info_from_row(row: &SqliteRow) -> Result<SessionScoreInfo> {
    Ok(SessionScoreInfo {
        score_id: row.try_get("score_id")?,
        is_new_score: row.try_get("is_new_score")?,
        score_delta: row.try_get("score_delta")?,
        percent_delta: row.try_get("percent_delta")?,
        lamp_delta: row.try_get("lamp_delta")?,
        grade_delta: row.try_get("grade_delta")?,
    })
}

pub async fn insert_session(pool: &SqlitePool, session: &Session) -> Result<()> {
    let calculated = to_json(&session.calculated)?;

    sqlx::query(
        r#"
        INSERT INTO sessions (
            session_id, user_id, game, playtype, name, time_started, time_ended, calculated
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.session_id.to_string())
    .bind(session.user_id)
    .bind(session.game.as_str())
    .bind(session.playtype.as_str())
    .bind(&session.name)
    .bind(session.time_started)
    .bind(session.time_ended)
    .bind(&calculated)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_session(pool: &SqlitePool, session_id: Uuid) -> Result<Option<Session>> {
    let sql = format!("SELECT {} FROM sessions WHERE session_id = ?", SESSION_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(session_id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(session_from_row).transpose()
}

/// A user's sessions for one game/playtype, newest first
pub async fn list_sessions(
    pool: &SqlitePool,
    user_id: i64,
    game: Game,
    playtype: Playtype,
) -> Result<Vec<Session>> {
    let sql = format!(
        "SELECT {} FROM sessions WHERE user_id = ? AND game = ? AND playtype = ? \
         ORDER BY time_started DESC, session_id",
        SESSION_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(game.as_str())
        .bind(playtype.as_str())
        .fetch_all(pool)
        .await?;
    rows.iter().map(session_from_row).collect()
}

/// Close a session and store its ratings; `false` if it was already closed
pub async fn end_session(
    pool: &SqlitePool,
    session_id: Uuid,
    time_ended: i64,
    calculated: &BTreeMap<String, f64>,
) -> Result<bool> {
    let calculated = to_json(calculated)?;
    let result = sqlx::query(
        "UPDATE sessions SET time_ended = ?, calculated = ? WHERE session_id = ? AND time_ended IS NULL",
    )
    .bind(time_ended)
    .bind(&calculated)
    .bind(session_id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Store score info; `false` if the score is already recorded for this session
pub async fn insert_score_info(
    pool: &SqlitePool,
    session_id: Uuid,
    info: &SessionScoreInfo,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO session_score_info (
            session_id, score_id, is_new_score, score_delta, percent_delta, lamp_delta, grade_delta
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(session_id, score_id) DO NOTHING
        "#,
    )
    .bind(session_id.to_string())
    .bind(&info.score_id)
    .bind(info.is_new_score)
    .bind(info.score_delta)
    .bind(info.percent_delta)
    .bind(info.lamp_delta)
    .bind(info.grade_delta)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_score_info(
    pool: &SqlitePool,
    session_id: Uuid,
    score_id: &str,
) -> Result<Option<SessionScoreInfo>> {
    let sql = format!(
        "SELECT {} FROM session_score_info WHERE session_id = ? AND score_id = ?",
        INFO_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(session_id.to_string())
        .bind(score_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(score_info_from_row).transpose()
}

/// Score info for a session in import order
pub async fn list_score_info(pool: &SqlitePool, session_id: Uuid) -> Result<Vec<SessionScoreInfo>> {
    let sql = format!(
        "SELECT {} FROM session_score_info WHERE session_id = ? ORDER BY rowid",
        INFO_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(session_id.to_string())
        .fetch_all(pool)
        .await?;
    rows.iter().map(score_info_from_row).collect()
}
