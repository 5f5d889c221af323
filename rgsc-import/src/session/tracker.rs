//! Session lifecycle and delta recording

use crate::db::{personal_bests, sessions};
use crate::locks::PairGuard;
use rgsc_common::db::{PersonalBest, ScoreRecord, Session, SessionScoreInfo};
use rgsc_common::game::game_config;
use rgsc_common::{ids, time, Error, Game, GameMode, Playtype, Result};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Deltas of `score` against the personal best it is about to be folded into
///
/// With no prior personal best the score is new and every delta is measured
/// from zero (the lowest lamp and grade index).
pub fn compute_score_info(pre_image: Option<&PersonalBest>, score: &ScoreRecord) -> SessionScoreInfo {
    match pre_image {
        None => SessionScoreInfo {
            score_id: score.score_id.clone(),
            is_new_score: true,
            score_delta: score.score,
            percent_delta: score.percent,
            lamp_delta: score.lamp_index as i64,
            grade_delta: score.grade_index as i64,
        },
        Some(pb) => SessionScoreInfo {
            score_id: score.score_id.clone(),
            is_new_score: false,
            score_delta: score.score - pb.score,
            percent_delta: score.percent - pb.percent,
            lamp_delta: score.lamp_index as i64 - pb.lamp_index as i64,
            grade_delta: score.grade_index as i64 - pb.grade_index as i64,
        },
    }
}

#[derive(Debug, Clone)]
pub struct SessionTracker {
    db: SqlitePool,
}

impl SessionTracker {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub(crate) fn db(&self) -> &SqlitePool {
        &self.db
    }

    /// Open a new session
    pub async fn create_session(
        &self,
        user_id: i64,
        game: Game,
        playtype: Playtype,
        name: &str,
    ) -> Result<Session> {
        game_config(game, playtype)?;

        let session = Session {
            session_id: ids::generate(),
            user_id,
            game,
            playtype,
            name: name.to_string(),
            time_started: time::now_millis(),
            time_ended: None,
            calculated: BTreeMap::new(),
        };
        sessions::insert_session(&self.db, &session).await?;

        info!(
            session_id = %session.session_id,
            user_id,
            mode = %session.mode(),
            "Session started"
        );
        Ok(session)
    }

    pub async fn session(&self, session_id: Uuid) -> Result<Session> {
        sessions::get_session(&self.db, session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Session {}", session_id)))
    }

    pub async fn list_sessions(
        &self,
        user_id: i64,
        game: Game,
        playtype: Playtype,
    ) -> Result<Vec<Session>> {
        sessions::list_sessions(&self.db, user_id, game, playtype).await
    }

    /// Session info rows in import order
    pub async fn score_info(&self, session_id: Uuid) -> Result<Vec<SessionScoreInfo>> {
        sessions::list_score_info(&self.db, session_id).await
    }

    /// Load a session and check it can take scores for this user and mode
    pub async fn open_session_for(
        &self,
        session_id: Uuid,
        user_id: i64,
        game: Game,
        playtype: Playtype,
    ) -> Result<Session> {
        let session = self.session(session_id).await?;

        if !session.is_open() {
            return Err(Error::InvalidInput(format!(
                "Session {} has already ended",
                session_id
            )));
        }
        if session.user_id != user_id {
            return Err(Error::InvalidInput(format!(
                "Session {} belongs to another user",
                session_id
            )));
        }
        if session.game != game || session.playtype != playtype {
            return Err(Error::InvalidInput(format!(
                "Session {} is for {}, not {}",
                session_id,
                session.mode(),
                GameMode::new(game, playtype)
            )));
        }

        Ok(session)
    }

    /// Record how `score` changes the user's standing on its chart
    ///
    /// Must run under the score's pair guard and before the score is
    /// consolidated, so the personal best read here is the pre-image.
    /// Recording the same score twice returns the first entry unchanged.
    pub async fn record_import(
        &self,
        guard: &PairGuard,
        session_id: Uuid,
        score: &ScoreRecord,
    ) -> Result<SessionScoreInfo> {
        if !guard.covers(score.user_id, &score.chart_id) {
            return Err(Error::Internal(format!(
                "Pair guard for user {} chart {} used for score {}",
                guard.user_id(),
                guard.chart_id(),
                score.score_id
            )));
        }

        self.open_session_for(session_id, score.user_id, score.game, score.playtype)
            .await?;

        if let Some(existing) = sessions::get_score_info(&self.db, session_id, &score.score_id).await? {
            return Ok(existing);
        }

        let pre_image =
            personal_bests::get_personal_best(&self.db, score.user_id, &score.chart_id).await?;
        let info = compute_score_info(pre_image.as_ref(), score);

        if !sessions::insert_score_info(&self.db, session_id, &info).await? {
            // Lost a race with another import of the same score
            return sessions::get_score_info(&self.db, session_id, &score.score_id)
                .await?
                .ok_or_else(|| {
                    Error::Internal(format!(
                        "Session info for {} vanished during insert",
                        score.score_id
                    ))
                });
        }

        debug!(
            session_id = %session_id,
            score_id = %info.score_id,
            is_new_score = info.is_new_score,
            score_delta = info.score_delta,
            lamp_delta = info.lamp_delta,
            "Recorded session score info"
        );
        Ok(info)
    }
}
