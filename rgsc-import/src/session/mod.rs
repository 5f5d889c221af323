//! Sessions and per-score deltas
//!
//! A session groups a user's imports on one game/playtype. Each score
//! imported into an open session gets a [`SessionScoreInfo`] describing how
//! it moved the user's personal best on that chart.
//!
//! [`SessionScoreInfo`]: rgsc_common::db::SessionScoreInfo

pub mod summary;
pub mod tracker;

pub use summary::{raise_breakdown, session_ratings, RaiseBreakdown, RaiseEntry, RaiseGroup};
pub use tracker::{compute_score_info, SessionTracker};
