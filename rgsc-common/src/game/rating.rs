//! Rating formulas
//!
//! Every formula is a plain `fn` over [`RatingInput`]: no I/O, no state.
//! `None` means the rating does not apply (e.g. the chart carries no
//! constant for it) and the field is left unset.

use super::registry::GameConfig;
use std::collections::BTreeMap;

/// Signature shared by all rating formulas
pub type RatingFn = fn(&RatingInput<'_>) -> Option<f64>;

/// Merged score state plus the chart's static difficulty inputs
#[derive(Debug, Clone, Copy)]
pub struct RatingInput<'a> {
    pub config: &'a GameConfig,
    pub score: f64,
    pub percent: f64,
    pub lamp: &'a str,
    pub lamp_index: usize,
    pub level_num: f64,
    pub chart_constants: &'a BTreeMap<String, f64>,
    pub optional: &'a BTreeMap<String, f64>,
}

impl RatingInput<'_> {
    /// True when the lamp ranks at or above `threshold` in this game's ordering
    pub fn lamp_at_least(&self, threshold: &str) -> bool {
        self.config
            .lamps
            .at_least(self.lamp, threshold)
            .unwrap_or(false)
    }

    pub fn chart_constant(&self, name: &str) -> Option<f64> {
        self.chart_constants.get(name).copied()
    }
}

// Absorbs representation error before flooring (e.g. 43.99999999 -> 44)
const FLOOR_EPSILON: f64 = 1e-9;

fn floor_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    ((value * scale) + FLOOR_EPSILON).floor() / scale
}

/// SDVX / USC Volforce (VF6) for a single chart
pub fn volforce_vf6(input: &RatingInput<'_>) -> Option<f64> {
    let score = input.score;
    let grade_coef = match score {
        s if s >= 9_900_000.0 => 1.05,
        s if s >= 9_800_000.0 => 1.02,
        s if s >= 9_700_000.0 => 1.0,
        s if s >= 9_500_000.0 => 0.97,
        s if s >= 9_300_000.0 => 0.94,
        s if s >= 9_000_000.0 => 0.91,
        s if s >= 8_700_000.0 => 0.88,
        s if s >= 7_500_000.0 => 0.85,
        s if s >= 6_500_000.0 => 0.82,
        _ => 0.8,
    };
    let lamp_coef = match input.lamp {
        "PERFECT ULTIMATE CHAIN" => 1.1,
        "ULTIMATE CHAIN" => 1.05,
        "EXCESSIVE CLEAR" => 1.02,
        "CLEAR" => 1.0,
        "FAILED" => 0.5,
        _ => return None,
    };

    let raw = input.level_num * 2.0 * (score / 10_000_000.0) * grade_coef * lamp_coef;
    Some(floor_to(raw / 100.0, 3))
}

/// maimai DX in-game rating for a single chart
///
/// `level_num` is the chart's internal (decimal) level constant.
pub fn maimai_dx_rate(input: &RatingInput<'_>) -> Option<f64> {
    let percent = input.percent.min(100.5);
    let coef = match percent {
        p if p >= 100.5 => 22.4,
        p if p >= 100.0 => 21.6,
        p if p >= 99.5 => 21.1,
        p if p >= 99.0 => 20.8,
        p if p >= 98.0 => 20.3,
        p if p >= 97.0 => 20.0,
        p if p >= 94.0 => 16.8,
        p if p >= 90.0 => 15.2,
        p if p >= 80.0 => 13.6,
        p if p >= 75.0 => 12.0,
        p if p >= 70.0 => 11.2,
        p if p >= 60.0 => 9.6,
        p if p >= 50.0 => 8.0,
        _ => 0.0,
    };

    Some(floor_to(input.level_num * coef * percent / 100.0, 0))
}

/// BMS/PMS sieglinde: the chart's clear-difficulty estimate for the best
/// clear achieved
pub fn sieglinde(input: &RatingInput<'_>) -> Option<f64> {
    let easy = input.chart_constant("sglEC");
    let hard = input.chart_constant("sglHC").or(easy);

    if easy.is_none() && hard.is_none() {
        return None;
    }

    if input.lamp_at_least("HARD CLEAR") {
        hard
    } else if input.lamp_at_least("EASY CLEAR") {
        easy.or(Some(0.0))
    } else {
        Some(0.0)
    }
}

/// IIDX lamp rating: the chart level once the chart is cleared
pub fn kt_lamp_rating(input: &RatingInput<'_>) -> Option<f64> {
    if input.lamp_at_least("CLEAR") {
        Some(input.level_num)
    } else {
        Some(0.0)
    }
}
