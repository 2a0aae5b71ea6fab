//! Error types for the matcher

use thiserror::Error;

/// Errors that abort a match
///
/// Schema discovery gaps, decomposition failures and adjudication failures
/// never surface here; they degrade inside the pipeline.
#[derive(Error, Debug)]
pub enum MatcherError {
    /// Fuzzy retrieval query failed (connection-class)
    #[error("Source error: {0}")]
    Source(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
