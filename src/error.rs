//! Error types for planning runs and job sources.

use thiserror::Error;

/// Reasons a planning request is rejected.
///
/// Degenerate inputs (no jobs, more technicians than jobs) are not errors,
/// and neither is a balancing pass that stops at its iteration cap.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("job source failed: {0}")]
    Source(#[from] SourceError),
}

/// Failures while fetching jobs from an external source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("job source returned status {0}")]
    Status(u16),
}
