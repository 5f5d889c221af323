//! rgsc-import: score import core
//!
//! Validates raw play results, stores them, tracks per-session deltas and
//! maintains consolidated personal bests per (user, chart).

pub mod catalog;
pub mod db;
pub mod locks;
pub mod pb;
pub mod pipeline;
pub mod session;
pub mod utils;
pub mod validator;

pub use catalog::{ChartCatalog, ChartLookup};
pub use pipeline::{
    GradedPersonalBest, ImportFailure, ImportOutcome, ImportReport, RecalcReport, ScoreImporter,
};
pub use validator::{RawScore, RawTimestamp, ScoreValidator};
