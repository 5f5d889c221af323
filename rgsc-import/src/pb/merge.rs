//! Personal-best assembly from a record set

use super::select;
use rgsc_common::db::{Chart, ComposedFrom, ComposedFromEntry, PersonalBest, ScoreRecord};
use rgsc_common::game::{GameConfig, RatingInput};
use std::collections::BTreeMap;
use tracing::trace;

/// Ratings for one (score, lamp, optional) state on a chart
pub fn ratings_for(
    config: &GameConfig,
    chart: &Chart,
    score: f64,
    percent: f64,
    lamp: &str,
    lamp_index: usize,
    optional: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    config.calculate_ratings(&RatingInput {
        config,
        score,
        percent,
        lamp,
        lamp_index,
        level_num: chart.level_num,
        chart_constants: &chart.data,
        optional,
    })
}

/// Assemble the personal best for a pair's full record set
///
/// Returns `None` for an empty set. The result depends only on the set's
/// contents, never on its order.
pub fn build_personal_best(
    config: &GameConfig,
    chart: &Chart,
    records: &[ScoreRecord],
) -> Option<PersonalBest> {
    let score_pb = select::score_best(config, records)?;
    let lamp_pb = select::lamp_best(records)?;

    let mut optional = score_pb.optional.clone();

    // Fields describing the clear travel with the lamp
    for field in &config.lamp_fields {
        match lamp_pb.optional.get(*field) {
            Some(value) => optional.insert(field.to_string(), *value),
            None => optional.remove(*field),
        };
    }

    let mut other = Vec::new();
    for spec in &config.aux_fields {
        match select::aux_best(spec, records, score_pb, lamp_pb) {
            Some((donor, value)) => {
                optional.insert(spec.name.to_string(), value);
                if donor.score_id != score_pb.score_id && donor.score_id != lamp_pb.score_id {
                    trace!(
                        field = spec.name,
                        donor = %donor.score_id,
                        "Borrowing auxiliary field"
                    );
                    other.push(ComposedFromEntry {
                        name: spec.label.to_string(),
                        score_id: donor.score_id.clone(),
                    });
                }
            }
            None => {
                optional.remove(spec.name);
            }
        }
    }

    let calculated = ratings_for(
        config,
        chart,
        score_pb.score,
        score_pb.percent,
        &lamp_pb.lamp,
        lamp_pb.lamp_index,
        &optional,
    );

    Some(PersonalBest {
        user_id: score_pb.user_id,
        chart_id: score_pb.chart_id.clone(),
        song_id: chart.song_id,
        game: score_pb.game,
        playtype: score_pb.playtype,
        score: score_pb.score,
        percent: score_pb.percent,
        grade: score_pb.grade.clone(),
        grade_index: score_pb.grade_index,
        lamp: lamp_pb.lamp.clone(),
        lamp_index: lamp_pb.lamp_index,
        optional,
        gauge_history: lamp_pb.gauge_history.clone(),
        calculated,
        composed_from: ComposedFrom {
            score_pb: score_pb.score_id.clone(),
            lamp_pb: lamp_pb.score_id.clone(),
            other,
        },
        time_achieved: score_pb.time_achieved.max(lamp_pb.time_achieved),
    })
}

/// Records whose stored ratings differ from what the chart now yields
pub fn stale_ratings(
    config: &GameConfig,
    chart: &Chart,
    records: &[ScoreRecord],
) -> Vec<(String, BTreeMap<String, f64>)> {
    records
        .iter()
        .filter_map(|record| {
            let fresh = ratings_for(
                config,
                chart,
                record.score,
                record.percent,
                &record.lamp,
                record.lamp_index,
                &record.optional,
            );
            (fresh != record.calculated).then(|| (record.score_id.clone(), fresh))
        })
        .collect()
}
