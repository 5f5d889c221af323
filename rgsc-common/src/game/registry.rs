//! Per-game declaration table
//!
//! Built once on first access and read-only afterwards, so concurrent
//! readers need no synchronization. Adding a game means adding an entry
//! here; consolidation and validation iterate these declarations.

use super::ordinal::OrderedSet;
use super::rating::{self, RatingFn, RatingInput};
use super::{Game, GameMode, Playtype};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Which submitted metric decides the score-best record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryMetric {
    Score,
    Percent,
}

/// Whether larger or smaller values of a field are better
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    /// Orders `a` against `b` so that `Greater` means "a is better"
    pub fn compare(self, a: f64, b: f64) -> std::cmp::Ordering {
        match self {
            Direction::Maximize => a.total_cmp(&b),
            Direction::Minimize => b.total_cmp(&a),
        }
    }
}

/// How percent is derived from the submitted data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentSource {
    /// The submission's primary metric is already a percent
    Provided,
    /// `score / (chart_constant * multiplier) * 100`
    ChartConstant {
        constant: &'static str,
        multiplier: f64,
    },
    /// `score / max * 100`
    FixedMax(f64),
}

/// Inclusive numeric bounds for a metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricBounds {
    pub min: f64,
    pub max: f64,
}

impl MetricBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub const fn non_negative() -> Self {
        Self::new(0.0, f64::MAX)
    }

    pub fn check(&self, metric: &str, value: f64) -> Result<()> {
        if value.is_finite() && value >= self.min && value <= self.max {
            Ok(())
        } else {
            Err(Error::OutOfRangeMetric {
                metric: metric.to_string(),
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// An optional metric that is consolidated independently of score and lamp
#[derive(Debug, Clone, Copy)]
pub struct AuxFieldSpec {
    pub name: &'static str,
    pub direction: Direction,
    /// Name recorded in the composed-from list when borrowed
    pub label: &'static str,
}

/// A named rating formula
#[derive(Clone, Copy)]
pub struct RatingSpec {
    pub name: &'static str,
    pub formula: RatingFn,
}

impl fmt::Debug for RatingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RatingSpec")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Everything the import core needs to know about one game/playtype
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub mode: GameMode,
    pub primary: PrimaryMetric,
    pub percent_source: PercentSource,
    /// Fixed score bounds; `None` when the maximum comes from the chart
    pub score_bounds: Option<MetricBounds>,
    pub percent_bounds: MetricBounds,
    pub lamps: OrderedSet,
    pub grades: OrderedSet,
    /// Minimum percent for each grade, parallel to `grades`
    pub grade_boundaries: Vec<f64>,
    pub optional_metrics: Vec<(&'static str, MetricBounds)>,
    pub aux_fields: Vec<AuxFieldSpec>,
    /// Optional metrics that describe the clear, copied from the lamp-best record
    pub lamp_fields: Vec<&'static str>,
    pub ratings: Vec<RatingSpec>,
}

impl GameConfig {
    /// Primary metric value of a (score, percent) pair
    pub fn primary_value(&self, score: f64, percent: f64) -> f64 {
        match self.primary {
            PrimaryMetric::Score => score,
            PrimaryMetric::Percent => percent,
        }
    }

    /// Maximum achievable score on a chart, if derivable
    pub fn max_score(&self, chart_constants: &BTreeMap<String, f64>) -> Option<f64> {
        match self.percent_source {
            PercentSource::Provided => Some(100.0),
            PercentSource::FixedMax(max) => Some(max),
            PercentSource::ChartConstant {
                constant,
                multiplier,
            } => chart_constants.get(constant).map(|c| c * multiplier),
        }
    }

    pub fn optional_bounds(&self, name: &str) -> Option<MetricBounds> {
        self.optional_metrics
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, b)| *b)
    }

    /// Evaluate every declared rating; formulas that do not apply are omitted
    pub fn calculate_ratings(&self, input: &RatingInput<'_>) -> BTreeMap<String, f64> {
        self.ratings
            .iter()
            .filter_map(|spec| (spec.formula)(input).map(|value| (spec.name.to_string(), value)))
            .collect()
    }
}

/// Look up the declaration for a game/playtype
///
/// A malformed declaration table surfaces here as [`Error::Config`].
pub fn game_config(game: Game, playtype: Playtype) -> Result<&'static GameConfig> {
    let registry = REGISTRY
        .as_ref()
        .map_err(|msg| Error::Config(format!("Game declarations: {}", msg)))?;
    registry
        .get(&GameMode::new(game, playtype))
        .ok_or_else(|| Error::UnknownGame(GameMode::new(game, playtype).to_string()))
}

static REGISTRY: Lazy<std::result::Result<HashMap<GameMode, GameConfig>, String>> =
    Lazy::new(|| build_registry().map_err(|e| e.to_string()));

fn build_registry() -> Result<HashMap<GameMode, GameConfig>> {
    let mut table = HashMap::new();
    for config in [
        iidx(Playtype::SP)?,
        iidx(Playtype::DP)?,
        bms(Playtype::K7)?,
        bms(Playtype::K14)?,
        sdvx_like(Game::Sdvx, Playtype::Single)?,
        sdvx_like(Game::Usc, Playtype::Controller)?,
        sdvx_like(Game::Usc, Playtype::Keyboard)?,
        maimai_dx()?,
    ] {
        table.insert(config.mode, config);
    }
    Ok(table)
}

// Lamps are listed best first, as the games display them
const BEATMANIA_LAMPS: [(&str, usize); 8] = [
    ("FULL COMBO", 7),
    ("EX HARD CLEAR", 6),
    ("HARD CLEAR", 5),
    ("CLEAR", 4),
    ("EASY CLEAR", 3),
    ("ASSIST CLEAR", 2),
    ("FAILED", 1),
    ("NO PLAY", 0),
];

const BEATMANIA_GRADES: [&str; 10] = ["F", "E", "D", "C", "B", "A", "AA", "AAA", "MAX-", "MAX"];

fn beatmania_boundaries() -> Vec<f64> {
    let ninth = 100.0 / 9.0;
    vec![
        0.0,
        2.0 * ninth,
        3.0 * ninth,
        4.0 * ninth,
        5.0 * ninth,
        6.0 * ninth,
        7.0 * ninth,
        8.0 * ninth,
        17.0 * 100.0 / 18.0,
        100.0,
    ]
}

const BEST_BP: AuxFieldSpec = AuxFieldSpec {
    name: "bp",
    direction: Direction::Minimize,
    label: "Best BP",
};

fn iidx(playtype: Playtype) -> Result<GameConfig> {
    Ok(GameConfig {
        mode: GameMode::new(Game::Iidx, playtype),
        primary: PrimaryMetric::Score,
        percent_source: PercentSource::ChartConstant {
            constant: "notecount",
            multiplier: 2.0,
        },
        score_bounds: None,
        percent_bounds: MetricBounds::new(0.0, 100.0),
        lamps: OrderedSet::from_ranked("lamp", &BEATMANIA_LAMPS)?,
        grades: OrderedSet::ascending("grade", &BEATMANIA_GRADES),
        grade_boundaries: beatmania_boundaries(),
        optional_metrics: vec![
            ("bp", MetricBounds::non_negative()),
            ("gauge", MetricBounds::new(0.0, 100.0)),
            ("comboBreak", MetricBounds::non_negative()),
            ("fast", MetricBounds::non_negative()),
            ("slow", MetricBounds::non_negative()),
            ("maxCombo", MetricBounds::non_negative()),
        ],
        aux_fields: vec![BEST_BP],
        lamp_fields: vec!["gauge", "comboBreak"],
        ratings: vec![RatingSpec {
            name: "ktLampRating",
            formula: rating::kt_lamp_rating,
        }],
    })
}

fn bms(playtype: Playtype) -> Result<GameConfig> {
    Ok(GameConfig {
        mode: GameMode::new(Game::Bms, playtype),
        primary: PrimaryMetric::Score,
        percent_source: PercentSource::ChartConstant {
            constant: "notecount",
            multiplier: 2.0,
        },
        score_bounds: None,
        percent_bounds: MetricBounds::new(0.0, 100.0),
        lamps: OrderedSet::from_ranked("lamp", &BEATMANIA_LAMPS)?,
        grades: OrderedSet::ascending("grade", &BEATMANIA_GRADES),
        grade_boundaries: beatmania_boundaries(),
        optional_metrics: vec![
            ("bp", MetricBounds::non_negative()),
            ("gauge", MetricBounds::new(0.0, 100.0)),
            ("maxCombo", MetricBounds::non_negative()),
        ],
        aux_fields: vec![BEST_BP],
        lamp_fields: vec!["gauge"],
        ratings: vec![RatingSpec {
            name: "sieglinde",
            formula: rating::sieglinde,
        }],
    })
}

fn sdvx_like(game: Game, playtype: Playtype) -> Result<GameConfig> {
    let (optional_metrics, aux_fields) = if game == Game::Sdvx {
        (
            vec![
                ("exScore", MetricBounds::non_negative()),
                ("gauge", MetricBounds::new(0.0, 100.0)),
                ("maxCombo", MetricBounds::non_negative()),
            ],
            vec![AuxFieldSpec {
                name: "exScore",
                direction: Direction::Maximize,
                label: "exScorePB",
            }],
        )
    } else {
        (
            vec![
                ("gauge", MetricBounds::new(0.0, 100.0)),
                ("maxCombo", MetricBounds::non_negative()),
            ],
            Vec::new(),
        )
    };

    Ok(GameConfig {
        mode: GameMode::new(game, playtype),
        primary: PrimaryMetric::Score,
        percent_source: PercentSource::FixedMax(10_000_000.0),
        score_bounds: Some(MetricBounds::new(0.0, 10_000_000.0)),
        percent_bounds: MetricBounds::new(0.0, 100.0),
        lamps: OrderedSet::from_ranked(
            "lamp",
            &[
                ("PERFECT ULTIMATE CHAIN", 4),
                ("ULTIMATE CHAIN", 3),
                ("EXCESSIVE CLEAR", 2),
                ("CLEAR", 1),
                ("FAILED", 0),
            ],
        )?,
        grades: OrderedSet::ascending(
            "grade",
            &["D", "C", "B", "A", "A+", "AA", "AA+", "AAA", "AAA+", "S", "PUC"],
        ),
        grade_boundaries: vec![0.0, 70.0, 80.0, 87.0, 90.0, 93.0, 95.0, 97.0, 98.0, 99.0, 100.0],
        optional_metrics,
        aux_fields,
        lamp_fields: Vec::new(),
        ratings: vec![RatingSpec {
            name: "VF6",
            formula: rating::volforce_vf6,
        }],
    })
}

fn maimai_dx() -> Result<GameConfig> {
    Ok(GameConfig {
        mode: GameMode::new(Game::MaimaiDx, Playtype::Single),
        primary: PrimaryMetric::Percent,
        percent_source: PercentSource::Provided,
        score_bounds: Some(MetricBounds::new(0.0, 101.0)),
        percent_bounds: MetricBounds::new(0.0, 101.0),
        lamps: OrderedSet::from_ranked(
            "lamp",
            &[
                ("ALL PERFECT+", 5),
                ("ALL PERFECT", 4),
                ("FULL COMBO+", 3),
                ("FULL COMBO", 2),
                ("CLEAR", 1),
                ("FAILED", 0),
            ],
        )?,
        grades: OrderedSet::ascending(
            "grade",
            &[
                "D", "C", "B", "BB", "BBB", "A", "AA", "AAA", "S", "S+", "SS", "SS+", "SSS", "SSS+",
            ],
        ),
        grade_boundaries: vec![
            0.0, 50.0, 60.0, 70.0, 75.0, 80.0, 90.0, 94.0, 97.0, 98.0, 99.0, 99.5, 100.0, 100.5,
        ],
        optional_metrics: vec![
            ("fast", MetricBounds::non_negative()),
            ("slow", MetricBounds::non_negative()),
            ("maxCombo", MetricBounds::non_negative()),
        ],
        aux_fields: Vec::new(),
        lamp_fields: Vec::new(),
        ratings: vec![RatingSpec {
            name: "rate",
            formula: rating::maimai_dx_rate,
        }],
    })
}
