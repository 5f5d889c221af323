//! Personal best storage

use super::{index_column, json_column, optional_json_column, parsed_column, to_json};
use rgsc_common::db::PersonalBest;
use rgsc_common::{Game, Playtype, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

const PB_COLUMNS: &str = "user_id, chart_id, song_id, game, playtype, score, percent, grade, \
                          grade_index, lamp, lamp_index, optional, gauge_history, calculated, \
                          composed_from, time_achieved";

fn personal_best_from_row(row: &SqliteRow) -> Result<PersonalBest> {
    Ok(PersonalBest {
        user_id: row.try_get("user_id")?,
        chart_id: row.try_get("chart_id")?,
        song_id: row.try_get("song_id")?,
        game: parsed_column(row, "game")?,
        playtype: parsed_column(row, "playtype")?,
        score: row.try_get("score")?,
        percent: row.try_get("percent")?,
        grade: row.try_get("grade")?,
        grade_index: index_column(row, "grade_index")?,
        lamp: row.try_get("lamp")?,
        lamp_index: index_column(row, "lamp_index")?,
        optional: json_column(row, "optional")?,
        gauge_history: optional_json_column(row, "gauge_history")?,
        calculated: json_column(row, "calculated")?,
        composed_from: json_column(row, "composed_from")?,
        time_achieved: row.try_get("time_achieved")?,
    })
}

pub async fn get_personal_best(
    pool: &SqlitePool,
    user_id: i64,
    chart_id: &str,
) -> Result<Option<PersonalBest>> {
    let sql = format!(
        "SELECT {} FROM personal_bests WHERE user_id = ? AND chart_id = ?",
        PB_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(chart_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(personal_best_from_row).transpose()
}

/// A user's bests for one game/playtype, best percent first
pub async fn personal_bests_for_user(
    pool: &SqlitePool,
    user_id: i64,
    game: Game,
    playtype: Playtype,
) -> Result<Vec<PersonalBest>> {
    let sql = format!(
        "SELECT {} FROM personal_bests WHERE user_id = ? AND game = ? AND playtype = ? \
         ORDER BY percent DESC, chart_id",
        PB_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(game.as_str())
        .bind(playtype.as_str())
        .fetch_all(pool)
        .await?;
    rows.iter().map(personal_best_from_row).collect()
}

/// Users holding a personal best on a chart
pub async fn users_with_pb_on_chart(pool: &SqlitePool, chart_id: &str) -> Result<Vec<i64>> {
    let users = sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM personal_bests WHERE chart_id = ? ORDER BY user_id",
    )
    .bind(chart_id)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// Write a personal best, replacing any previous one for the pair
pub async fn upsert_personal_best(conn: &mut SqliteConnection, pb: &PersonalBest) -> Result<()> {
    let optional = to_json(&pb.optional)?;
    let gauge_history = pb.gauge_history.as_ref().map(to_json).transpose()?;
    let calculated = to_json(&pb.calculated)?;
    let composed_from = to_json(&pb.composed_from)?;

    sqlx::query(
        r#"
        INSERT INTO personal_bests (
            user_id, chart_id, song_id, game, playtype, score, percent, grade, grade_index,
            lamp, lamp_index, optional, gauge_history, calculated, composed_from, time_achieved
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, chart_id) DO UPDATE SET
            song_id = excluded.song_id,
            game = excluded.game,
            playtype = excluded.playtype,
            score = excluded.score,
            percent = excluded.percent,
            grade = excluded.grade,
            grade_index = excluded.grade_index,
            lamp = excluded.lamp,
            lamp_index = excluded.lamp_index,
            optional = excluded.optional,
            gauge_history = excluded.gauge_history,
            calculated = excluded.calculated,
            composed_from = excluded.composed_from,
            time_achieved = excluded.time_achieved
        "#,
    )
    .bind(pb.user_id)
    .bind(&pb.chart_id)
    .bind(pb.song_id)
    .bind(pb.game.as_str())
    .bind(pb.playtype.as_str())
    .bind(pb.score)
    .bind(pb.percent)
    .bind(&pb.grade)
    .bind(pb.grade_index as i64)
    .bind(&pb.lamp)
    .bind(pb.lamp_index as i64)
    .bind(&optional)
    .bind(&gauge_history)
    .bind(&calculated)
    .bind(&composed_from)
    .bind(pb.time_achieved)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn delete_personal_best(
    conn: &mut SqliteConnection,
    user_id: i64,
    chart_id: &str,
) -> Result<bool> {
    let result = sqlx::query("DELETE FROM personal_bests WHERE user_id = ? AND chart_id = ?")
        .bind(user_id)
        .bind(chart_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
