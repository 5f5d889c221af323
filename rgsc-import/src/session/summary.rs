//! Session ratings and raise breakdown

use super::tracker::SessionTracker;
use crate::db::{scores, sessions};
use rgsc_common::db::{ScoreRecord, Session, SessionScoreInfo};
use rgsc_common::game::{game_config, GameConfig, OrderedSet};
use rgsc_common::{time, Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::info;
use uuid::Uuid;

/// Number of top values averaged into a session rating
pub const SESSION_RATING_TOP: usize = 10;

/// Mean of the best [`SESSION_RATING_TOP`] values of each declared rating
///
/// Ratings no score in the session carries are left out.
pub fn session_ratings(config: &GameConfig, scores: &[ScoreRecord]) -> BTreeMap<String, f64> {
    let mut ratings = BTreeMap::new();

    for spec in &config.ratings {
        let mut values: Vec<f64> = scores
            .iter()
            .filter_map(|score| score.calculated.get(spec.name).copied())
            .collect();
        if values.is_empty() {
            continue;
        }

        values.sort_by(|a, b| b.total_cmp(a));
        values.truncate(SESSION_RATING_TOP);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        ratings.insert(spec.name.to_string(), mean);
    }

    ratings
}

/// One score that raised a lamp or grade
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaiseEntry {
    pub score_id: String,
    pub chart_id: String,
    pub is_new_score: bool,
    /// Value held before this score; `None` for a first play
    pub previous: Option<String>,
}

/// Scores that reached one lamp or grade value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaiseGroup {
    pub value: String,
    pub index: usize,
    pub entries: Vec<RaiseEntry>,
}

/// Lamp and grade raises in a session, best value first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RaiseBreakdown {
    pub lamps: Vec<RaiseGroup>,
    pub grades: Vec<RaiseGroup>,
}

/// Group session scores by the lamp and grade they newly reached
///
/// A score counts toward its lamp when it is a first play or raised the
/// lamp, and likewise for its grade. Scores keep import order within a group.
pub fn raise_breakdown(
    config: &GameConfig,
    infos: &[SessionScoreInfo],
    scores: &[ScoreRecord],
) -> RaiseBreakdown {
    let by_id: HashMap<&str, &ScoreRecord> =
        scores.iter().map(|s| (s.score_id.as_str(), s)).collect();

    let mut lamps: BTreeMap<usize, Vec<RaiseEntry>> = BTreeMap::new();
    let mut grades: BTreeMap<usize, Vec<RaiseEntry>> = BTreeMap::new();

    for info in infos {
        let Some(score) = by_id.get(info.score_id.as_str()) else {
            continue;
        };

        let previous = info.previous(score);

        if info.is_new_score || info.lamp_delta > 0 {
            lamps.entry(score.lamp_index).or_default().push(entry(
                info,
                score,
                &config.lamps,
                previous.as_ref().map(|p| p.lamp_index),
            ));
        }
        if info.is_new_score || info.grade_delta > 0 {
            grades.entry(score.grade_index).or_default().push(entry(
                info,
                score,
                &config.grades,
                previous.as_ref().map(|p| p.grade_index),
            ));
        }
    }

    RaiseBreakdown {
        lamps: groups(&config.lamps, lamps),
        grades: groups(&config.grades, grades),
    }
}

fn entry(
    info: &SessionScoreInfo,
    score: &ScoreRecord,
    set: &OrderedSet,
    previous_index: Option<i64>,
) -> RaiseEntry {
    let previous = previous_index
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| set.value_at(i))
        .map(str::to_string);

    RaiseEntry {
        score_id: score.score_id.clone(),
        chart_id: score.chart_id.clone(),
        is_new_score: info.is_new_score,
        previous,
    }
}

fn groups(set: &OrderedSet, by_index: BTreeMap<usize, Vec<RaiseEntry>>) -> Vec<RaiseGroup> {
    by_index
        .into_iter()
        .rev()
        .map(|(index, entries)| RaiseGroup {
            value: set.value_at(index).unwrap_or_default().to_string(),
            index,
            entries,
        })
        .collect()
}

impl SessionTracker {
    /// Close a session and store its ratings
    pub async fn end_session(&self, session_id: Uuid) -> Result<Session> {
        let session = self.session(session_id).await?;
        if !session.is_open() {
            return Err(Error::InvalidInput(format!(
                "Session {} has already ended",
                session_id
            )));
        }

        let config = game_config(session.game, session.playtype)?;
        let session_scores = scores::scores_for_session(self.db(), session_id).await?;
        let calculated = session_ratings(config, &session_scores);
        let time_ended = time::now_millis();

        if !sessions::end_session(self.db(), session_id, time_ended, &calculated).await? {
            return Err(Error::InvalidInput(format!(
                "Session {} has already ended",
                session_id
            )));
        }

        info!(
            session_id = %session_id,
            scores = session_scores.len(),
            "Session ended"
        );

        Ok(Session {
            time_ended: Some(time_ended),
            calculated,
            ..session
        })
    }

    /// Lamp and grade raises for a session
    pub async fn raise_breakdown(&self, session_id: Uuid) -> Result<RaiseBreakdown> {
        let session = self.session(session_id).await?;
        let config = game_config(session.game, session.playtype)?;
        let infos = sessions::list_score_info(self.db(), session_id).await?;
        let session_scores = scores::scores_for_session(self.db(), session_id).await?;
        Ok(raise_breakdown(config, &infos, &session_scores))
    }
}
