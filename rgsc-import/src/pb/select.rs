//! Donor selection over a record set
//!
//! Every selector is a strict total order over records, so the result does
//! not depend on the order records were loaded or imported in. Ties on the
//! selected value go to the newest `time_achieved` (records without one
//! count as oldest), then to the smallest score id.

use rgsc_common::db::ScoreRecord;
use rgsc_common::game::{AuxFieldSpec, GameConfig};
use std::cmp::Ordering;

/// `Greater` when `a` wins a tie against `b`
fn recency(a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
    a.time_achieved
        .cmp(&b.time_achieved)
        .then_with(|| b.score_id.cmp(&a.score_id))
}

/// Record with the best primary metric
pub fn score_best<'a>(config: &GameConfig, records: &'a [ScoreRecord]) -> Option<&'a ScoreRecord> {
    records.iter().max_by(|a, b| {
        config
            .primary_value(a.score, a.percent)
            .total_cmp(&config.primary_value(b.score, b.percent))
            .then_with(|| recency(a, b))
    })
}

/// Record with the highest-ranked lamp
pub fn lamp_best(records: &[ScoreRecord]) -> Option<&ScoreRecord> {
    records
        .iter()
        .max_by(|a, b| a.lamp_index.cmp(&b.lamp_index).then_with(|| recency(a, b)))
}

/// Record holding the best value of an auxiliary field, with that value
///
/// Ties prefer the score-best record, then the lamp-best record, so a
/// borrowed value only shows up in composed-from when it is strictly better.
pub fn aux_best<'a>(
    spec: &AuxFieldSpec,
    records: &'a [ScoreRecord],
    score_pb: &ScoreRecord,
    lamp_pb: &ScoreRecord,
) -> Option<(&'a ScoreRecord, f64)> {
    let base_rank = |record: &ScoreRecord| {
        if record.score_id == score_pb.score_id {
            2
        } else if record.score_id == lamp_pb.score_id {
            1
        } else {
            0
        }
    };

    records
        .iter()
        .filter_map(|record| record.optional.get(spec.name).map(|value| (record, *value)))
        .max_by(|(a, a_value), (b, b_value)| {
            spec.direction
                .compare(*a_value, *b_value)
                .then_with(|| base_rank(a).cmp(&base_rank(b)))
                .then_with(|| recency(a, b))
        })
}
