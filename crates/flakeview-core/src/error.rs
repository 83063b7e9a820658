//! Error taxonomy for the analytics core.
//!
//! Two things can go wrong: a caller hands us nothing to analyze, or the
//! storage collaborator fails. Insufficient data is neither; it produces a
//! zero-confidence placeholder analysis instead of an error.

use thiserror::Error;

/// Errors surfaced by the analyzer and aggregators.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Caller contract violation: an empty execution history was passed to
    /// the single-test analyzer.
    #[error("no execution results provided")]
    EmptyResults,

    /// Failure fetching raw results from the storage collaborator,
    /// propagated unmodified. The core does not retry storage I/O.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
