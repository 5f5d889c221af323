//! Score record storage
//!
//! Score records are immutable once written apart from their `calculated`
//! ratings, which consolidation refreshes when chart data changes.

use super::{index_column, json_column, optional_json_column, parsed_column, to_json};
use rgsc_common::db::ScoreRecord;
use rgsc_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;

const SCORE_COLUMNS: &str = "score_id, user_id, chart_id, song_id, game, playtype, score, percent, \
                             lamp, lamp_index, grade, grade_index, optional, gauge_history, \
                             time_achieved, time_added, service, import_type, calculated";

pub(crate) fn score_from_row(row: &SqliteRow) -> Result<ScoreRecord> {
    Ok(ScoreRecord {
        score_id: row.try_get("score_id")?,
        user_id: row.try_get("user_id")?,
        chart_id: row.try_get("chart_id")?,
        song_id: row.try_get("song_id")?,
        game: parsed_column(row, "game")?,
        playtype: parsed_column(row, "playtype")?,
        score: row.try_get("score")?,
        percent: row.try_get("percent")?,
        lamp: row.try_get("lamp")?,
        lamp_index: index_column(row, "lamp_index")?,
        grade: row.try_get("grade")?,
        grade_index: index_column(row, "grade_index")?,
        optional: json_column(row, "optional")?,
        gauge_history: optional_json_column(row, "gauge_history")?,
        time_achieved: row.try_get("time_achieved")?,
        time_added: row.try_get("time_added")?,
        service: row.try_get("service")?,
        import_type: row.try_get("import_type")?,
        calculated: json_column(row, "calculated")?,
    })
}

/// Store a score record
///
/// Returns `false` without writing when a record with the same id exists.
pub async fn insert_score(pool: &SqlitePool, score: &ScoreRecord) -> Result<bool> {
    let optional = to_json(&score.optional)?;
    let gauge_history = score.gauge_history.as_ref().map(to_json).transpose()?;
    let calculated = to_json(&score.calculated)?;

    let result = sqlx::query(
        r#"
        INSERT INTO scores (
            score_id, user_id, chart_id, song_id, game, playtype, score, percent,
            lamp, lamp_index, grade, grade_index, optional, gauge_history,
            time_achieved, time_added, service, import_type, calculated
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(score_id) DO NOTHING
        "#,
    )
    .bind(&score.score_id)
    .bind(score.user_id)
    .bind(&score.chart_id)
    .bind(score.song_id)
    .bind(score.game.as_str())
    .bind(score.playtype.as_str())
    .bind(score.score)
    .bind(score.percent)
    .bind(&score.lamp)
    .bind(score.lamp_index as i64)
    .bind(&score.grade)
    .bind(score.grade_index as i64)
    .bind(&optional)
    .bind(&gauge_history)
    .bind(score.time_achieved)
    .bind(score.time_added)
    .bind(&score.service)
    .bind(&score.import_type)
    .bind(&calculated)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_score(pool: &SqlitePool, score_id: &str) -> Result<Option<ScoreRecord>> {
    let sql = format!("SELECT {} FROM scores WHERE score_id = ?", SCORE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(score_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(score_from_row).transpose()
}

/// Every record for one (user, chart) pair, ordered by score id
pub async fn scores_for_pair(
    pool: &SqlitePool,
    user_id: i64,
    chart_id: &str,
) -> Result<Vec<ScoreRecord>> {
    let sql = format!(
        "SELECT {} FROM scores WHERE user_id = ? AND chart_id = ? ORDER BY score_id",
        SCORE_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(chart_id)
        .fetch_all(pool)
        .await?;
    rows.iter().map(score_from_row).collect()
}

/// Records imported into a session, in import order
pub async fn scores_for_session(pool: &SqlitePool, session_id: Uuid) -> Result<Vec<ScoreRecord>> {
    let columns = SCORE_COLUMNS
        .split(", ")
        .map(|c| format!("s.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {} FROM session_score_info i JOIN scores s ON s.score_id = i.score_id \
         WHERE i.session_id = ? ORDER BY i.rowid",
        columns
    );
    let rows = sqlx::query(&sql)
        .bind(session_id.to_string())
        .fetch_all(pool)
        .await?;
    rows.iter().map(score_from_row).collect()
}

/// Users holding at least one record on a chart
pub async fn users_with_scores_on_chart(pool: &SqlitePool, chart_id: &str) -> Result<Vec<i64>> {
    let users = sqlx::query_scalar::<_, i64>(
        "SELECT DISTINCT user_id FROM scores WHERE chart_id = ? ORDER BY user_id",
    )
    .bind(chart_id)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn delete_score(pool: &SqlitePool, score_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM scores WHERE score_id = ?")
        .bind(score_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Replace a record's derived ratings
pub async fn update_calculated(
    conn: &mut SqliteConnection,
    score_id: &str,
    calculated: &BTreeMap<String, f64>,
) -> Result<()> {
    let calculated = to_json(calculated)?;
    sqlx::query("UPDATE scores SET calculated = ? WHERE score_id = ?")
        .bind(&calculated)
        .bind(score_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
