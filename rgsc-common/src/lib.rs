//! # rgsc Common Library
//!
//! Shared code for the rgsc crates including:
//! - Error taxonomy
//! - Configuration loading
//! - Database bootstrap and row models
//! - Game declarations: lamp/grade orderings, grade boundaries, rating formulas
//! - Time and identifier utilities

pub mod config;
pub mod db;
pub mod error;
pub mod game;
pub mod ids;
pub mod time;

pub use error::{Error, ErrorKind, Result};
pub use game::{Game, GameMode, Playtype};
