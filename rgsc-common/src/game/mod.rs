//! Game identifiers and the per-game declaration table
//!
//! Everything game-specific (lamp and grade orderings, metric bounds,
//! auxiliary field directions, rating formulas) lives in [`registry`] as
//! data. Code that consolidates or validates scores looks up a
//! [`GameConfig`] and iterates it rather than branching on the game.

pub mod grade;
pub mod ordinal;
pub mod rating;
pub mod registry;

pub use grade::{Closer, GradeDelta, GradeDeltaDisplay};
pub use ordinal::OrderedSet;
pub use rating::{RatingFn, RatingInput};
pub use registry::{
    game_config, AuxFieldSpec, Direction, GameConfig, MetricBounds, PercentSource,
    PrimaryMetric, RatingSpec,
};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Game {
    #[serde(rename = "iidx")]
    Iidx,
    #[serde(rename = "bms")]
    Bms,
    #[serde(rename = "sdvx")]
    Sdvx,
    #[serde(rename = "usc")]
    Usc,
    #[serde(rename = "maimai-dx")]
    MaimaiDx,
}

impl Game {
    pub fn as_str(&self) -> &'static str {
        match self {
            Game::Iidx => "iidx",
            Game::Bms => "bms",
            Game::Sdvx => "sdvx",
            Game::Usc => "usc",
            Game::MaimaiDx => "maimai-dx",
        }
    }

    pub const ALL: [Game; 5] = [Game::Iidx, Game::Bms, Game::Sdvx, Game::Usc, Game::MaimaiDx];
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Game {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Game::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| Error::UnknownGame(s.to_string()))
    }
}

/// Play style within a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Playtype {
    SP,
    DP,
    #[serde(rename = "7K")]
    K7,
    #[serde(rename = "14K")]
    K14,
    Single,
    Controller,
    Keyboard,
}

impl Playtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Playtype::SP => "SP",
            Playtype::DP => "DP",
            Playtype::K7 => "7K",
            Playtype::K14 => "14K",
            Playtype::Single => "Single",
            Playtype::Controller => "Controller",
            Playtype::Keyboard => "Keyboard",
        }
    }

    const ALL: [Playtype; 7] = [
        Playtype::SP,
        Playtype::DP,
        Playtype::K7,
        Playtype::K14,
        Playtype::Single,
        Playtype::Controller,
        Playtype::Keyboard,
    ];
}

impl fmt::Display for Playtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Playtype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Playtype::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::UnknownGame(format!("playtype {}", s)))
    }
}

/// A (game, playtype) pair, rendered as `game:playtype`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameMode {
    pub game: Game,
    pub playtype: Playtype,
}

impl GameMode {
    pub fn new(game: Game, playtype: Playtype) -> Self {
        Self { game, playtype }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.game, self.playtype)
    }
}
