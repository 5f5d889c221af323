//! Score import pipeline
//!
//! Ties validation, storage, session tracking and consolidation together.
//! For each accepted score, under the score's pair guard:
//!
//! 1. store the record (an identical record already stored is a duplicate)
//! 2. record session deltas against the current personal best
//! 3. consolidate the personal best
//!
//! Different pairs run in parallel; a batch preserves submission order in
//! its report regardless of completion order.

use crate::catalog::ChartCatalog;
use crate::db::{charts, personal_bests, scores};
use crate::locks::PairLocks;
use crate::pb::PbEngine;
use crate::session::SessionTracker;
use crate::validator::{RawScore, ScoreValidator};
use futures::stream::{self, StreamExt};
use rgsc_common::db::{
    get_setting_i64, PersonalBest, ScoreRecord, SessionScoreInfo, DEFAULT_BATCH_CONCURRENCY,
    DEFAULT_MAX_LOCK_WAIT_MS,
};
use rgsc_common::game::{game_config, GradeDeltaDisplay, PrimaryMetric};
use rgsc_common::{Error, ErrorKind, Game, Playtype, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What happened to one accepted submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ImportOutcome {
    Imported {
        score: ScoreRecord,
        session_info: Option<SessionScoreInfo>,
        personal_best: Option<PersonalBest>,
    },
    /// An identical record was already stored; nothing changed
    Duplicate { score_id: String },
}

impl ImportOutcome {
    pub fn score_id(&self) -> &str {
        match self {
            ImportOutcome::Imported { score, .. } => &score.score_id,
            ImportOutcome::Duplicate { score_id } => score_id,
        }
    }
}

/// A rejected or failed submission in a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    pub kind: String,
    pub message: String,
}

impl From<&Error> for ImportFailure {
    fn from(err: &Error) -> Self {
        let kind = match err.kind() {
            ErrorKind::Validation => "validation",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Storage => "storage",
            ErrorKind::Other => "other",
        };
        Self {
            kind: kind.to_string(),
            message: err.to_string(),
        }
    }
}

/// Per-submission results of a batch, in submission order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub results: Vec<std::result::Result<ImportOutcome, ImportFailure>>,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, Ok(ImportOutcome::Imported { .. })))
            .count()
    }

    pub fn duplicates(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, Ok(ImportOutcome::Duplicate { .. })))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_err()).count()
    }
}

/// Per-user results of re-consolidating one chart
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalcReport {
    pub recalculated: Vec<i64>,
    pub failed: Vec<(i64, ImportFailure)>,
}

/// A personal best with its distance to the surrounding grades
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedPersonalBest {
    #[serde(flatten)]
    pub personal_best: PersonalBest,
    pub grade_delta: Option<GradeDeltaDisplay>,
}

/// Entry point for imports and personal-best maintenance
#[derive(Debug, Clone)]
pub struct ScoreImporter {
    db: SqlitePool,
    validator: ScoreValidator,
    engine: PbEngine,
    tracker: SessionTracker,
    locks: Arc<PairLocks>,
    batch_concurrency: usize,
}

impl ScoreImporter {
    /// Build an importer, reading tuning values from the settings table
    pub async fn new(db: SqlitePool) -> Result<Self> {
        let max_lock_wait_ms =
            get_setting_i64(&db, "db_max_lock_wait_ms", DEFAULT_MAX_LOCK_WAIT_MS).await?;
        let batch_concurrency =
            get_setting_i64(&db, "import_batch_concurrency", DEFAULT_BATCH_CONCURRENCY).await?;

        Ok(Self::with_limits(
            db,
            u64::try_from(max_lock_wait_ms).unwrap_or(0),
            usize::try_from(batch_concurrency).unwrap_or(1),
        ))
    }

    pub fn with_limits(db: SqlitePool, max_lock_wait_ms: u64, batch_concurrency: usize) -> Self {
        let catalog = ChartCatalog::new(db.clone());
        Self {
            validator: ScoreValidator::new(catalog),
            engine: PbEngine::new(db.clone(), max_lock_wait_ms),
            tracker: SessionTracker::new(db.clone()),
            locks: Arc::new(PairLocks::new()),
            batch_concurrency: batch_concurrency.max(1),
            db,
        }
    }

    pub fn catalog(&self) -> &ChartCatalog {
        self.validator.catalog()
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Validate and import one submission
    ///
    /// Rejected submissions store nothing. Once the record is stored the pair
    /// is always consolidated, even when the session update fails; that
    /// error is returned after the personal best is brought up to date. If
    /// consolidation itself fails the record stays, and re-importing it
    /// consolidates the pair again.
    pub async fn import_score(
        &self,
        user_id: i64,
        session_id: Option<Uuid>,
        raw: &RawScore,
    ) -> Result<ImportOutcome> {
        if let Some(session_id) = session_id {
            self.tracker
                .open_session_for(session_id, user_id, raw.game, raw.playtype)
                .await?;
        }

        let validated = self.validator.validate(user_id, raw).await?;
        let record = validated.record;

        let guard = self.locks.acquire(record.user_id, &record.chart_id).await;

        if !scores::insert_score(&self.db, &record).await? {
            info!(
                user_id,
                score_id = %record.score_id,
                "Duplicate score skipped"
            );
            // The stored copy may predate an interrupted import
            self.engine.consolidate(&guard).await?;
            return Ok(ImportOutcome::Duplicate {
                score_id: record.score_id,
            });
        }

        let session_info = match session_id {
            Some(session_id) => match self.tracker.record_import(&guard, session_id, &record).await {
                Ok(info) => Some(info),
                Err(err) => {
                    warn!(
                        user_id,
                        session_id = %session_id,
                        score_id = %record.score_id,
                        error = %err,
                        "Session update failed, consolidating stored score"
                    );
                    self.engine.consolidate(&guard).await?;
                    return Err(err);
                }
            },
            None => None,
        };

        let personal_best = self.engine.consolidate(&guard).await?;
        drop(guard);

        Ok(ImportOutcome::Imported {
            score: record,
            session_info,
            personal_best,
        })
    }

    /// Import many submissions, pairs in parallel up to the configured limit
    pub async fn import_batch(
        &self,
        user_id: i64,
        session_id: Option<Uuid>,
        raws: &[RawScore],
    ) -> ImportReport {
        let results: Vec<_> = stream::iter(raws.iter().enumerate())
            .map(|(index, raw)| async move {
                self.import_score(user_id, session_id, raw)
                    .await
                    .map_err(|err| {
                        warn!(user_id, index, error = %err, "Score import failed");
                        ImportFailure::from(&err)
                    })
            })
            .buffered(self.batch_concurrency)
            .collect()
            .await;

        let report = ImportReport { results };
        info!(
            user_id,
            imported = report.imported(),
            duplicates = report.duplicates(),
            failed = report.failed(),
            "Batch import finished"
        );
        report
    }

    /// Rebuild one pair's personal best from its stored records
    pub async fn consolidate(&self, user_id: i64, chart_id: &str) -> Result<Option<PersonalBest>> {
        let guard = self.locks.acquire(user_id, chart_id).await;
        self.engine.consolidate(&guard).await
    }

    /// Delete a score record and re-consolidate its pair
    pub async fn delete_score(&self, score_id: &str) -> Result<Option<PersonalBest>> {
        let record = scores::get_score(&self.db, score_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Score {}", score_id)))?;

        let guard = self.locks.acquire(record.user_id, &record.chart_id).await;
        if !scores::delete_score(&self.db, score_id).await? {
            return Err(Error::NotFound(format!("Score {}", score_id)));
        }
        info!(
            user_id = record.user_id,
            chart_id = %record.chart_id,
            score_id,
            "Score deleted"
        );

        self.engine.consolidate(&guard).await
    }

    /// Re-consolidate every pair on a chart, e.g. after its data changed
    ///
    /// A pair that fails keeps its previous personal best and does not stop
    /// the remaining pairs.
    pub async fn recalculate_chart(&self, chart_id: &str) -> Result<RecalcReport> {
        let mut users: BTreeSet<i64> = scores::users_with_scores_on_chart(&self.db, chart_id)
            .await?
            .into_iter()
            .collect();
        users.extend(personal_bests::users_with_pb_on_chart(&self.db, chart_id).await?);

        let mut report = RecalcReport::default();
        for user_id in users {
            match self.consolidate(user_id, chart_id).await {
                Ok(_) => report.recalculated.push(user_id),
                Err(err) => {
                    error!(user_id, chart_id, error = %err, "Personal best recalculation failed");
                    report.failed.push((user_id, ImportFailure::from(&err)));
                }
            }
        }

        info!(
            chart_id,
            recalculated = report.recalculated.len(),
            failed = report.failed.len(),
            "Chart recalculated"
        );
        Ok(report)
    }

    pub async fn personal_best(&self, user_id: i64, chart_id: &str) -> Result<Option<PersonalBest>> {
        personal_bests::get_personal_best(&self.db, user_id, chart_id).await
    }

    pub async fn personal_bests(
        &self,
        user_id: i64,
        game: Game,
        playtype: Playtype,
    ) -> Result<Vec<PersonalBest>> {
        personal_bests::personal_bests_for_user(&self.db, user_id, game, playtype).await
    }

    /// Personal bests for a mode, each with its grade distance
    pub async fn graded_personal_bests(
        &self,
        user_id: i64,
        game: Game,
        playtype: Playtype,
    ) -> Result<Vec<GradedPersonalBest>> {
        let pbs = self.personal_bests(user_id, game, playtype).await?;
        let mut graded = Vec::with_capacity(pbs.len());
        for personal_best in pbs {
            let grade_delta = self.grade_delta(&personal_best).await?;
            graded.push(GradedPersonalBest {
                personal_best,
                grade_delta,
            });
        }
        Ok(graded)
    }

    /// "AA+120 / AAA-340" distances for a personal best's score
    ///
    /// `None` for percent-ranked games and charts without a known maximum.
    pub async fn grade_delta(&self, pb: &PersonalBest) -> Result<Option<GradeDeltaDisplay>> {
        let config = game_config(pb.game, pb.playtype)?;
        if config.primary == PrimaryMetric::Percent {
            return Ok(None);
        }
        let Some(chart) = charts::get_chart(&self.db, &pb.chart_id).await? else {
            return Ok(None);
        };

        Ok(config
            .max_score(&chart.data)
            .and_then(|max| config.format_grade_delta(pb.score, max, pb.grade_index)))
    }

    /// Every stored record for a pair
    pub async fn scores_for(&self, user_id: i64, chart_id: &str) -> Result<Vec<ScoreRecord>> {
        scores::scores_for_pair(&self.db, user_id, chart_id).await
    }
}
