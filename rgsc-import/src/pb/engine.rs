//! Consolidation against storage

use super::merge::{build_personal_best, stale_ratings};
use crate::db::{charts, personal_bests, scores};
use crate::locks::PairGuard;
use crate::utils::retry_on_lock;
use rgsc_common::db::PersonalBest;
use rgsc_common::game::game_config;
use rgsc_common::{Error, Result};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// Result of one consolidation pass, computed before anything is written
#[derive(Debug, Clone)]
struct ConsolidationPass {
    user_id: i64,
    chart_id: String,
    personal_best: Option<PersonalBest>,
    rescored: Vec<(String, BTreeMap<String, f64>)>,
}

/// Recomputes and persists personal bests
#[derive(Debug, Clone)]
pub struct PbEngine {
    db: SqlitePool,
    max_lock_wait_ms: u64,
}

impl PbEngine {
    pub fn new(db: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            db,
            max_lock_wait_ms,
        }
    }

    /// Rebuild the personal best for the guarded pair from every stored record
    ///
    /// Writes the new personal best (or removes it when no records remain)
    /// and refreshes any record ratings that went stale, in one transaction.
    /// On error nothing is written and the previous personal best stays.
    pub async fn consolidate(&self, guard: &PairGuard) -> Result<Option<PersonalBest>> {
        let pass = self.compute(guard.user_id(), guard.chart_id()).await?;

        retry_on_lock("personal best write", self.max_lock_wait_ms, || {
            self.commit(&pass)
        })
        .await?;

        match &pass.personal_best {
            Some(pb) => debug!(
                user_id = pass.user_id,
                chart_id = %pass.chart_id,
                score_pb = %pb.composed_from.score_pb,
                lamp_pb = %pb.composed_from.lamp_pb,
                "Consolidated personal best"
            ),
            None => info!(
                user_id = pass.user_id,
                chart_id = %pass.chart_id,
                "No records remain, personal best removed"
            ),
        }

        Ok(pass.personal_best)
    }

    async fn compute(&self, user_id: i64, chart_id: &str) -> Result<ConsolidationPass> {
        let records = scores::scores_for_pair(&self.db, user_id, chart_id).await?;

        let Some(first) = records.first() else {
            return Ok(ConsolidationPass {
                user_id,
                chart_id: chart_id.to_string(),
                personal_best: None,
                rescored: Vec::new(),
            });
        };

        let config = game_config(first.game, first.playtype)?;

        let chart = match charts::get_chart(&self.db, chart_id).await? {
            Some(chart) => chart,
            None => {
                error!(
                    user_id,
                    chart_id,
                    records = records.len(),
                    "Chart metadata missing while consolidating personal best"
                );
                return Err(Error::ChartMetadataMissing(chart_id.to_string()));
            }
        };

        let personal_best = build_personal_best(config, &chart, &records);
        let rescored = stale_ratings(config, &chart, &records);

        Ok(ConsolidationPass {
            user_id,
            chart_id: chart_id.to_string(),
            personal_best,
            rescored,
        })
    }

    async fn commit(&self, pass: &ConsolidationPass) -> Result<()> {
        let mut tx = self.db.begin().await?;

        for (score_id, calculated) in &pass.rescored {
            scores::update_calculated(&mut tx, score_id, calculated).await?;
        }

        match &pass.personal_best {
            Some(pb) => personal_bests::upsert_personal_best(&mut tx, pb).await?,
            None => {
                personal_bests::delete_personal_best(&mut tx, pass.user_id, &pass.chart_id)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
