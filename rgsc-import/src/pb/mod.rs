//! Personal-best consolidation
//!
//! A personal best is not a single stored score. It is assembled from the
//! full record set of a (user, chart) pair: the score-best record supplies
//! score, percent and grade, the lamp-best record supplies the lamp, and
//! each auxiliary field is borrowed from whichever record holds its best
//! value. Ratings are then recomputed over the merged result.
//!
//! [`select`] and [`merge`] are pure; [`engine`] loads, merges and writes.

pub mod engine;
pub mod merge;
pub mod select;

pub use engine::PbEngine;
pub use merge::build_personal_best;
