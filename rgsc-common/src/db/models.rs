//! Database models

use crate::game::{Game, GameMode, Playtype};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: i64,
    pub game: Game,
    pub title: String,
    pub artist: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub chart_id: String,
    pub song_id: i64,
    pub game: Game,
    pub playtype: Playtype,
    pub difficulty: String,
    pub level: String,
    pub level_num: f64,
    pub in_game_id: Option<i64>,
    pub is_primary: bool,
    /// Static difficulty inputs (`notecount`, `sglEC`, ...)
    #[serde(default)]
    pub data: BTreeMap<String, f64>,
}

impl Chart {
    pub fn mode(&self) -> GameMode {
        GameMode::new(self.game, self.playtype)
    }
}

/// One accepted play result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub score_id: String,
    pub user_id: i64,
    pub chart_id: String,
    pub song_id: i64,
    pub game: Game,
    pub playtype: Playtype,
    pub score: f64,
    pub percent: f64,
    pub lamp: String,
    pub lamp_index: usize,
    pub grade: String,
    pub grade_index: usize,
    pub optional: BTreeMap<String, f64>,
    pub gauge_history: Option<Vec<f64>>,
    /// Milliseconds since the Unix epoch
    pub time_achieved: Option<i64>,
    pub time_added: i64,
    pub service: String,
    pub import_type: String,
    pub calculated: BTreeMap<String, f64>,
}

impl ScoreRecord {
    pub fn mode(&self) -> GameMode {
        GameMode::new(self.game, self.playtype)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedFromEntry {
    pub name: String,
    pub score_id: String,
}

/// Which score records a personal best was assembled from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedFrom {
    pub score_pb: String,
    pub lamp_pb: String,
    #[serde(default)]
    pub other: Vec<ComposedFromEntry>,
}

/// Consolidated best for one (user, chart)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalBest {
    pub user_id: i64,
    pub chart_id: String,
    pub song_id: i64,
    pub game: Game,
    pub playtype: Playtype,
    pub score: f64,
    pub percent: f64,
    pub grade: String,
    pub grade_index: usize,
    pub lamp: String,
    pub lamp_index: usize,
    pub optional: BTreeMap<String, f64>,
    pub gauge_history: Option<Vec<f64>>,
    pub calculated: BTreeMap<String, f64>,
    pub composed_from: ComposedFrom,
    pub time_achieved: Option<i64>,
}

/// A bounded run of plays by one user on one game/playtype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: i64,
    pub game: Game,
    pub playtype: Playtype,
    pub name: String,
    pub time_started: i64,
    pub time_ended: Option<i64>,
    pub calculated: BTreeMap<String, f64>,
}

impl Session {
    pub fn mode(&self) -> GameMode {
        GameMode::new(self.game, self.playtype)
    }

    pub fn is_open(&self) -> bool {
        self.time_ended.is_none()
    }
}

/// Effect of one imported score on the user's standing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionScoreInfo {
    pub score_id: String,
    pub is_new_score: bool,
    pub score_delta: f64,
    pub percent_delta: f64,
    pub lamp_delta: i64,
    pub grade_delta: i64,
}

/// Best standing before a session score, rebuilt from its stored deltas
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousBest {
    pub score: f64,
    pub percent: f64,
    pub lamp_index: i64,
    pub grade_index: i64,
}

impl SessionScoreInfo {
    /// Previous best for display, `None` for a first play
    pub fn previous(&self, score: &ScoreRecord) -> Option<PreviousBest> {
        if self.is_new_score {
            return None;
        }
        Some(PreviousBest {
            score: score.score - self.score_delta,
            percent: score.percent - self.percent_delta,
            lamp_index: score.lamp_index as i64 - self.lamp_delta,
            grade_index: score.grade_index as i64 - self.grade_delta,
        })
    }
}
