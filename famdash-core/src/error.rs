//! Error types for the famdash ecosystem.

use thiserror::Error;

/// Errors that can occur while aggregating calendar feeds.
///
/// None of these abort a whole aggregation run: fetch and parse failures
/// are contained per source, recurrence failures per event. The worst
/// case across the board is an empty but valid result list.
#[derive(Error, Debug)]
pub enum FamDashError {
    #[error("Failed to fetch calendar: {0}")]
    Fetch(String),

    #[error("Failed to parse calendar data: {0}")]
    Parse(String),

    #[error("Invalid recurrence rule: {0}")]
    Recurrence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for famdash operations.
pub type FamDashResult<T> = Result<T, FamDashError>;
