//! Common error types for rgsc
//!
//! Variants are grouped by [`ErrorKind`]:
//! - Validation: bad submission, rejected before anything is stored
//! - Integrity: catalog inconsistencies that need operator attention
//! - Storage: database and filesystem failures

use thiserror::Error;

/// Common result type for rgsc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Integrity,
    Storage,
    Other,
}

/// Common error types across rgsc crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No game/playtype declaration exists for this identifier
    #[error("Unknown game or playtype: {0}")]
    UnknownGame(String),

    /// No chart matches the submitted chart identity
    #[error("Chart not found: {0}")]
    ChartNotFound(String),

    /// Chart resolved but its parent song is missing
    #[error("Song-Chart Desync on songID {song_id} (chartID {chart_id})")]
    SongChartDesync { chart_id: String, song_id: i64 },

    /// Timestamp could not be interpreted
    #[error("Invalid/Unparsable score timestamp of {0}")]
    UnparsableTimestamp(String),

    /// Numeric metric outside its declared range
    #[error("Metric {metric} = {value} is outside [{min}, {max}]")]
    OutOfRangeMetric {
        metric: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value is not a member of the ordered set
    #[error("Unknown {set} value: {value}")]
    UnknownOrdinalValue { set: String, value: String },

    /// Chart needed for rating recomputation disappeared
    #[error("Chart metadata missing for chartID {0}")]
    ChartMetadataMissing(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_)
            | Error::UnknownGame(_)
            | Error::ChartNotFound(_)
            | Error::UnparsableTimestamp(_)
            | Error::OutOfRangeMetric { .. }
            | Error::UnknownOrdinalValue { .. } => ErrorKind::Validation,
            Error::SongChartDesync { .. } | Error::ChartMetadataMissing(_) => {
                ErrorKind::Integrity
            }
            Error::Database(_) | Error::Io(_) => ErrorKind::Storage,
            Error::Config(_) | Error::NotFound(_) | Error::Internal(_) => ErrorKind::Other,
        }
    }

    /// True for the SQLite busy/locked condition that is worth retrying
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Error::Database(db_err) => db_err.to_string().contains("database is locked"),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(format!("JSON encoding failed: {}", err))
    }
}
