//! Canonical score validation
//!
//! Turns a raw submission into a [`ScoreRecord`] or rejects it. Nothing is
//! written here; a rejected submission leaves no trace in storage.

use crate::catalog::{ChartCatalog, ChartLookup};
use rgsc_common::db::{Chart, ScoreRecord, Song};
use rgsc_common::game::{game_config, GameConfig, MetricBounds, PercentSource, RatingInput};
use rgsc_common::ids::{self, ScoreIdentity};
use rgsc_common::time;
use rgsc_common::{Error, Game, Playtype, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Submission timestamp as sent: epoch milliseconds or text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl RawTimestamp {
    pub fn to_millis(&self) -> Result<i64> {
        match self {
            RawTimestamp::Millis(millis) => time::validate_millis(*millis, &millis.to_string()),
            RawTimestamp::Text(text) => time::parse_timestamp(text),
        }
    }
}

/// A play result as submitted by a converter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScore {
    pub game: Game,
    pub playtype: Playtype,
    pub identifier: ChartLookup,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub percent: Option<f64>,
    pub lamp: String,
    #[serde(default)]
    pub optional: BTreeMap<String, f64>,
    #[serde(default)]
    pub gauge_history: Option<Vec<f64>>,
    #[serde(default)]
    pub time_achieved: Option<RawTimestamp>,
    pub service: String,
    pub import_type: String,
}

/// A record that passed validation, with the catalog entries it resolved to
#[derive(Debug, Clone)]
pub struct ValidatedScore {
    pub record: ScoreRecord,
    pub chart: Chart,
    pub song: Song,
}

#[derive(Debug, Clone)]
pub struct ScoreValidator {
    catalog: ChartCatalog,
}

impl ScoreValidator {
    pub fn new(catalog: ChartCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ChartCatalog {
        &self.catalog
    }

    /// Validate a submission for `user_id`
    ///
    /// Checks run in a fixed order (game, chart, song, timestamp, metrics,
    /// lamp, optional metrics) and the first failure is returned.
    pub async fn validate(&self, user_id: i64, raw: &RawScore) -> Result<ValidatedScore> {
        let config = game_config(raw.game, raw.playtype)?;

        let chart = self
            .catalog
            .resolve_chart(raw.game, raw.playtype, &raw.identifier)
            .await?;
        let song = self.catalog.resolve_song(&chart).await?;

        let time_achieved = raw
            .time_achieved
            .as_ref()
            .map(RawTimestamp::to_millis)
            .transpose()?;

        let (score, percent) = derive_metrics(config, &chart, raw)?;

        let lamp_index = config.lamps.index_of(&raw.lamp)?;
        let lamp = config.lamps.value_at(lamp_index).unwrap_or_default();

        check_optional(config, &raw.optional)?;
        if let Some(history) = &raw.gauge_history {
            if let Some(bad) = history.iter().find(|v| !v.is_finite()) {
                return Err(Error::InvalidInput(format!("gaugeHistory contains {}", bad)));
            }
        }

        let (grade, grade_index) = config.grade_for_percent(percent);

        let calculated = config.calculate_ratings(&RatingInput {
            config,
            score,
            percent,
            lamp,
            lamp_index,
            level_num: chart.level_num,
            chart_constants: &chart.data,
            optional: &raw.optional,
        });

        let score_id = ids::score_id(&ScoreIdentity {
            user_id,
            chart_id: &chart.chart_id,
            score,
            lamp,
            optional: &raw.optional,
            time_achieved,
        });

        debug!(
            user_id,
            chart_id = %chart.chart_id,
            score_id = %score_id,
            "Validated score"
        );

        let record = ScoreRecord {
            score_id,
            user_id,
            chart_id: chart.chart_id.clone(),
            song_id: song.id,
            game: raw.game,
            playtype: raw.playtype,
            score,
            percent,
            lamp: lamp.to_string(),
            lamp_index,
            grade: grade.to_string(),
            grade_index,
            optional: raw.optional.clone(),
            gauge_history: raw.gauge_history.clone(),
            time_achieved,
            time_added: time::now_millis(),
            service: raw.service.clone(),
            import_type: raw.import_type.clone(),
            calculated,
        };

        Ok(ValidatedScore {
            record,
            chart,
            song,
        })
    }
}

/// Derive (score, percent) and check both against their bounds
fn derive_metrics(config: &GameConfig, chart: &Chart, raw: &RawScore) -> Result<(f64, f64)> {
    let (score, percent) = match config.percent_source {
        PercentSource::Provided => {
            let percent = raw.percent.or(raw.score).ok_or_else(|| {
                Error::InvalidInput(format!("{} submissions require a percent", config.mode))
            })?;
            (percent, percent)
        }
        PercentSource::FixedMax(_) | PercentSource::ChartConstant { .. } => {
            let score = raw.score.ok_or_else(|| {
                Error::InvalidInput(format!("{} submissions require a score", config.mode))
            })?;
            let max = config.max_score(&chart.data).ok_or_else(|| {
                Error::ChartMetadataMissing(format!(
                    "{} (no maximum score derivable)",
                    chart.chart_id
                ))
            })?;
            if max <= 0.0 {
                return Err(Error::ChartMetadataMissing(format!(
                    "{} (maximum score {})",
                    chart.chart_id, max
                )));
            }
            MetricBounds::new(0.0, max).check("score", score)?;
            (score, score / max * 100.0)
        }
    };

    if let Some(bounds) = config.score_bounds {
        bounds.check("score", score)?;
    }
    config.percent_bounds.check("percent", percent)?;

    Ok((score, percent))
}

fn check_optional(config: &GameConfig, optional: &BTreeMap<String, f64>) -> Result<()> {
    for (name, value) in optional {
        let bounds = config.optional_bounds(name).ok_or_else(|| {
            Error::InvalidInput(format!("{} is not a known metric for {}", name, config.mode))
        })?;
        bounds.check(name, *value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(game: Game, playtype: Playtype) -> RawScore {
        RawScore {
            game,
            playtype,
            identifier: ChartLookup::ChartId {
                chart_id: "c1".to_string(),
            },
            score: None,
            percent: None,
            lamp: "CLEAR".to_string(),
            optional: BTreeMap::new(),
            gauge_history: None,
            time_achieved: None,
            service: "test".to_string(),
            import_type: "file/json".to_string(),
        }
    }

    fn chart(game: Game, playtype: Playtype, data: &[(&str, f64)]) -> Chart {
        Chart {
            chart_id: "c1".to_string(),
            song_id: 1,
            game,
            playtype,
            difficulty: "ANOTHER".to_string(),
            level: "10".to_string(),
            level_num: 10.0,
            in_game_id: None,
            is_primary: true,
            data: data.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_percent_from_notecount() {
        let config = game_config(Game::Iidx, Playtype::SP).unwrap();
        let chart = chart(Game::Iidx, Playtype::SP, &[("notecount", 786.0)]);
        let mut submission = raw(Game::Iidx, Playtype::SP);
        submission.score = Some(1179.0);

        let (score, percent) = derive_metrics(config, &chart, &submission).unwrap();
        assert_eq!(score, 1179.0);
        assert!((percent - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_above_chart_max_is_rejected() {
        let config = game_config(Game::Iidx, Playtype::SP).unwrap();
        let chart = chart(Game::Iidx, Playtype::SP, &[("notecount", 100.0)]);
        let mut submission = raw(Game::Iidx, Playtype::SP);
        submission.score = Some(201.0);

        assert!(matches!(
            derive_metrics(config, &chart, &submission),
            Err(Error::OutOfRangeMetric { .. })
        ));
    }

    #[test]
    fn test_missing_notecount_is_integrity_error() {
        let config = game_config(Game::Bms, Playtype::K7).unwrap();
        let chart = chart(Game::Bms, Playtype::K7, &[]);
        let mut submission = raw(Game::Bms, Playtype::K7);
        submission.score = Some(100.0);

        assert!(matches!(
            derive_metrics(config, &chart, &submission),
            Err(Error::ChartMetadataMissing(_))
        ));
    }

    #[test]
    fn test_sdvx_fixed_max() {
        let config = game_config(Game::Sdvx, Playtype::Single).unwrap();
        let chart = chart(Game::Sdvx, Playtype::Single, &[]);
        let mut submission = raw(Game::Sdvx, Playtype::Single);
        submission.score = Some(9_500_000.0);

        let (_, percent) = derive_metrics(config, &chart, &submission).unwrap();
        assert!((percent - 95.0).abs() < 1e-9);

        submission.score = Some(10_000_001.0);
        assert!(derive_metrics(config, &chart, &submission).is_err());
    }

    #[test]
    fn test_maimai_requires_percent() {
        let config = game_config(Game::MaimaiDx, Playtype::Single).unwrap();
        let chart = chart(Game::MaimaiDx, Playtype::Single, &[]);
        let mut submission = raw(Game::MaimaiDx, Playtype::Single);

        assert!(matches!(
            derive_metrics(config, &chart, &submission),
            Err(Error::InvalidInput(_))
        ));

        submission.percent = Some(100.7);
        assert_eq!(
            derive_metrics(config, &chart, &submission).unwrap(),
            (100.7, 100.7)
        );

        submission.percent = Some(101.5);
        assert!(derive_metrics(config, &chart, &submission).is_err());
    }

    #[test]
    fn test_undeclared_optional_metric_is_rejected() {
        let config = game_config(Game::Sdvx, Playtype::Single).unwrap();
        let good: BTreeMap<String, f64> = [("exScore".to_string(), 1500.0)].into();
        assert!(check_optional(config, &good).is_ok());

        let unknown: BTreeMap<String, f64> = [("bp".to_string(), 3.0)].into();
        assert!(matches!(
            check_optional(config, &unknown),
            Err(Error::InvalidInput(_))
        ));

        let negative: BTreeMap<String, f64> = [("exScore".to_string(), -1.0)].into();
        assert!(matches!(
            check_optional(config, &negative),
            Err(Error::OutOfRangeMetric { .. })
        ));
    }

    #[test]
    fn test_timestamp_forms() {
        assert_eq!(RawTimestamp::Millis(1_616_537_722_000).to_millis().unwrap(), 1_616_537_722_000);
        assert!(RawTimestamp::Millis(-5).to_millis().is_err());

        let err = RawTimestamp::Text("INVALID".to_string()).to_millis().unwrap_err();
        assert_eq!(err.to_string(), "Invalid/Unparsable score timestamp of INVALID");
    }

    #[test]
    fn test_raw_score_wire_format() {
        let json = r#"{
            "game": "sdvx",
            "playtype": "Single",
            "identifier": {"matchType": "chartId", "chartId": "c1"},
            "score": 9500000,
            "lamp": "CLEAR",
            "optional": {"exScore": 1500},
            "timeAchieved": "2021-03-24 07:15:22",
            "service": "eamusement",
            "importType": "file/csv"
        }"#;
        let parsed: RawScore = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.score, Some(9_500_000.0));
        assert_eq!(
            parsed.time_achieved,
            Some(RawTimestamp::Text("2021-03-24 07:15:22".to_string()))
        );
    }
}
