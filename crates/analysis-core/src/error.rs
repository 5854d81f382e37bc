use thiserror::Error;

/// Per-ticker failure taxonomy. None of these abort a multi-ticker batch on
/// their own; a batch fails only when no ticker produced usable data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Zero or missing origin: {0}")]
    ZeroOrMissingOrigin(String),

    #[error("No overlapping period: {0}")]
    NoOverlappingPeriod(String),

    #[error("Line item not found: {0}")]
    LineItemNotFound(String),

    #[error("Invalid series: {0}")]
    InvalidSeries(String),
}
