//! Song and chart catalog rows

use super::{json_column, parsed_column, to_json};
use rgsc_common::db::{Chart, Song};
use rgsc_common::{Game, Playtype, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const CHART_COLUMNS: &str = "chart_id, song_id, game, playtype, difficulty, level, level_num, \
                             in_game_id, is_primary, data";

fn chart_from_row(row: &SqliteRow) -> Result<Chart> {
    Ok(Chart {
        chart_id: row.try_get("chart_id")?,
        song_id: row.try_get("song_id")?,
        game: parsed_column(row, "game")?,
        playtype: parsed_column(row, "playtype")?,
        difficulty: row.try_get("difficulty")?,
        level: row.try_get("level")?,
        level_num: row.try_get("level_num")?,
        in_game_id: row.try_get("in_game_id")?,
        is_primary: row.try_get("is_primary")?,
        data: json_column(row, "data")?,
    })
}

/// Insert or replace a song
pub async fn upsert_song(pool: &SqlitePool, song: &Song) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO songs (game, id, title, artist) VALUES (?, ?, ?, ?)
        ON CONFLICT(game, id) DO UPDATE SET title = excluded.title, artist = excluded.artist
        "#,
    )
    .bind(song.game.as_str())
    .bind(song.id)
    .bind(&song.title)
    .bind(&song.artist)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert or replace a chart
pub async fn upsert_chart(pool: &SqlitePool, chart: &Chart) -> Result<()> {
    let data = to_json(&chart.data)?;

    sqlx::query(
        r#"
        INSERT INTO charts (
            chart_id, song_id, game, playtype, difficulty, level, level_num,
            in_game_id, is_primary, data
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(chart_id) DO UPDATE SET
            song_id = excluded.song_id,
            game = excluded.game,
            playtype = excluded.playtype,
            difficulty = excluded.difficulty,
            level = excluded.level,
            level_num = excluded.level_num,
            in_game_id = excluded.in_game_id,
            is_primary = excluded.is_primary,
            data = excluded.data
        "#,
    )
    .bind(&chart.chart_id)
    .bind(chart.song_id)
    .bind(chart.game.as_str())
    .bind(chart.playtype.as_str())
    .bind(&chart.difficulty)
    .bind(&chart.level)
    .bind(chart.level_num)
    .bind(chart.in_game_id)
    .bind(chart.is_primary)
    .bind(&data)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_chart(pool: &SqlitePool, chart_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM charts WHERE chart_id = ?")
        .bind(chart_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_chart(pool: &SqlitePool, chart_id: &str) -> Result<Option<Chart>> {
    let sql = format!("SELECT {} FROM charts WHERE chart_id = ?", CHART_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(chart_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(chart_from_row).transpose()
}

pub async fn find_chart_by_in_game_id(
    pool: &SqlitePool,
    game: Game,
    playtype: Playtype,
    in_game_id: i64,
    difficulty: &str,
) -> Result<Option<Chart>> {
    let sql = format!(
        "SELECT {} FROM charts WHERE game = ? AND playtype = ? AND in_game_id = ? \
         AND difficulty = ? AND is_primary = 1",
        CHART_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(game.as_str())
        .bind(playtype.as_str())
        .bind(in_game_id)
        .bind(difficulty)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(chart_from_row).transpose()
}

pub async fn find_chart_by_song(
    pool: &SqlitePool,
    game: Game,
    playtype: Playtype,
    song_id: i64,
    difficulty: &str,
) -> Result<Option<Chart>> {
    let sql = format!(
        "SELECT {} FROM charts WHERE game = ? AND playtype = ? AND song_id = ? \
         AND difficulty = ? AND is_primary = 1",
        CHART_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(game.as_str())
        .bind(playtype.as_str())
        .bind(song_id)
        .bind(difficulty)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(chart_from_row).transpose()
}

/// Title match is exact; more than one match is treated as no match
pub async fn find_chart_by_title(
    pool: &SqlitePool,
    game: Game,
    playtype: Playtype,
    title: &str,
    difficulty: &str,
) -> Result<Option<Chart>> {
    let sql = format!(
        "SELECT {} FROM charts WHERE game = ? AND playtype = ? AND difficulty = ? \
         AND is_primary = 1 AND song_id IN (SELECT id FROM songs WHERE game = ? AND title = ?) \
         LIMIT 2",
        CHART_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(game.as_str())
        .bind(playtype.as_str())
        .bind(difficulty)
        .bind(game.as_str())
        .bind(title)
        .fetch_all(pool)
        .await?;

    if rows.len() == 1 {
        chart_from_row(&rows[0]).map(Some)
    } else {
        if rows.len() > 1 {
            tracing::warn!(game = %game, title, difficulty, "Ambiguous song title match");
        }
        Ok(None)
    }
}

pub async fn get_song(pool: &SqlitePool, game: Game, song_id: i64) -> Result<Option<Song>> {
    let row = sqlx::query("SELECT game, id, title, artist FROM songs WHERE game = ? AND id = ?")
        .bind(game.as_str())
        .bind(song_id)
        .fetch_optional(pool)
        .await?;

    row.map(|row| -> Result<Song> {
        Ok(Song {
            game: parsed_column(&row, "game")?,
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            artist: row.try_get("artist")?,
        })
    })
    .transpose()
}
