//! Shared fixtures for rgsc-import integration tests
//!
//! Each test gets its own tempfile-backed database seeded with a small
//! catalog covering every declared game.

#![allow(dead_code)]

use rgsc_common::db::{init_database, Chart, Song};
use rgsc_common::{Game, Playtype};
use rgsc_import::{ChartLookup, RawScore, RawTimestamp, ScoreImporter};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tempfile::TempDir;

pub const USER: i64 = 1;
pub const SDVX_CHART: &str = "sdvx-1-exh";
pub const IIDX_CHART: &str = "iidx-511-spa";
pub const DESYNC_CHART: &str = "iidx-desync";
pub const MAIMAI_CHART: &str = "mai-1-mas";
pub const BMS_CHART: &str = "bms-1-7k";

pub struct TestEnv {
    pub pool: SqlitePool,
    pub importer: ScoreImporter,
    _dir: TempDir,
}

pub async fn setup() -> TestEnv {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("rgsc.db")).await.unwrap();
    let importer = ScoreImporter::with_limits(pool.clone(), 5000, 8);
    seed_catalog(&importer).await;
    TestEnv {
        pool,
        importer,
        _dir: dir,
    }
}

fn song(game: Game, id: i64, title: &str) -> Song {
    Song {
        id,
        game,
        title: title.to_string(),
        artist: "Test Artist".to_string(),
    }
}

fn chart(
    chart_id: &str,
    song_id: i64,
    game: Game,
    playtype: Playtype,
    difficulty: &str,
    level_num: f64,
    in_game_id: Option<i64>,
    data: &[(&str, f64)],
) -> Chart {
    Chart {
        chart_id: chart_id.to_string(),
        song_id,
        game,
        playtype,
        difficulty: difficulty.to_string(),
        level: level_num.to_string(),
        level_num,
        in_game_id,
        is_primary: true,
        data: data.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
    }
}

pub async fn seed_catalog(importer: &ScoreImporter) {
    let catalog = importer.catalog();

    for s in [
        song(Game::Sdvx, 1, "Lachryma"),
        song(Game::Iidx, 1000, "5.1.1."),
        song(Game::MaimaiDx, 1, "Oshama Scramble!"),
        song(Game::Bms, 1, "Test BMS"),
    ] {
        catalog.add_song(&s).await.unwrap();
    }

    for c in [
        sdvx_chart(18.0),
        chart(
            IIDX_CHART,
            1000,
            Game::Iidx,
            Playtype::SP,
            "ANOTHER",
            10.0,
            Some(1000),
            &[("notecount", 786.0)],
        ),
        // song 999 does not exist
        chart(
            DESYNC_CHART,
            999,
            Game::Iidx,
            Playtype::SP,
            "HYPER",
            8.0,
            Some(999),
            &[("notecount", 500.0)],
        ),
        chart(
            MAIMAI_CHART,
            1,
            Game::MaimaiDx,
            Playtype::Single,
            "Master",
            13.7,
            None,
            &[],
        ),
        chart(
            BMS_CHART,
            1,
            Game::Bms,
            Playtype::K7,
            "ANOTHER",
            12.0,
            None,
            &[("notecount", 1000.0), ("sglEC", 10.5), ("sglHC", 12.25)],
        ),
    ] {
        catalog.add_chart(&c).await.unwrap();
    }
}

pub fn sdvx_chart(level_num: f64) -> Chart {
    chart(
        SDVX_CHART,
        1,
        Game::Sdvx,
        Playtype::Single,
        "EXH",
        level_num,
        Some(1),
        &[],
    )
}

fn raw(game: Game, playtype: Playtype, identifier: ChartLookup, lamp: &str) -> RawScore {
    RawScore {
        game,
        playtype,
        identifier,
        score: None,
        percent: None,
        lamp: lamp.to_string(),
        optional: BTreeMap::new(),
        gauge_history: None,
        time_achieved: None,
        service: "test".to_string(),
        import_type: "file/json".to_string(),
    }
}

pub fn sdvx(score: f64, lamp: &str, time: i64) -> RawScore {
    let mut raw = raw(
        Game::Sdvx,
        Playtype::Single,
        ChartLookup::ChartId {
            chart_id: SDVX_CHART.to_string(),
        },
        lamp,
    );
    raw.score = Some(score);
    raw.time_achieved = Some(RawTimestamp::Millis(time));
    raw
}

pub fn sdvx_ex(score: f64, lamp: &str, ex_score: f64, time: i64) -> RawScore {
    let mut raw = sdvx(score, lamp, time);
    raw.optional.insert("exScore".to_string(), ex_score);
    raw
}

pub fn iidx(score: f64, lamp: &str, bp: Option<f64>, time: i64) -> RawScore {
    let mut raw = raw(
        Game::Iidx,
        Playtype::SP,
        ChartLookup::InGameId {
            in_game_id: 1000,
            difficulty: "ANOTHER".to_string(),
        },
        lamp,
    );
    raw.score = Some(score);
    if let Some(bp) = bp {
        raw.optional.insert("bp".to_string(), bp);
    }
    raw.time_achieved = Some(RawTimestamp::Millis(time));
    raw
}

pub fn maimai(percent: f64, lamp: &str, time: i64) -> RawScore {
    let mut raw = raw(
        Game::MaimaiDx,
        Playtype::Single,
        ChartLookup::SongTitle {
            title: "Oshama Scramble!".to_string(),
            difficulty: "Master".to_string(),
        },
        lamp,
    );
    raw.percent = Some(percent);
    raw.time_achieved = Some(RawTimestamp::Millis(time));
    raw
}

pub fn bms(score: f64, lamp: &str, time: i64) -> RawScore {
    let mut raw = raw(
        Game::Bms,
        Playtype::K7,
        ChartLookup::ChartId {
            chart_id: BMS_CHART.to_string(),
        },
        lamp,
    );
    raw.score = Some(score);
    raw.time_achieved = Some(RawTimestamp::Millis(time));
    raw
}

/// Unpack an `Imported` outcome, panicking on `Duplicate`
pub fn imported(
    outcome: rgsc_import::ImportOutcome,
) -> (
    rgsc_common::db::ScoreRecord,
    Option<rgsc_common::db::SessionScoreInfo>,
    Option<rgsc_common::db::PersonalBest>,
) {
    match outcome {
        rgsc_import::ImportOutcome::Imported {
            score,
            session_info,
            personal_best,
        } => (score, session_info, personal_best),
        other => panic!("expected Imported, got {:?}", other),
    }
}

pub async fn score_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM scores")
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
