//! Error taxonomy (spec.md §7). Detectors never raise for domain rejections
//! — they return `None` — so most of these variants surface only at the
//! orchestrator/supervisor boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WyckoffError {
    /// Invalid config: date order, non-positive capital, risk pct > 2.0,
    /// empty symbols. Rejected synchronously at the supervisor boundary.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Malformed or inconsistent input bars/ranges, caught before a
    /// detector would otherwise panic.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Concurrency cap exceeded at admission time.
    #[error("admission denied: {reason}")]
    Admission { reason: String },

    /// Market-data provider chain exhausted. The background task maps this
    /// to FAILED with the provider's message; there is no retry in the core.
    #[error("market data unavailable for {symbol}: {message}")]
    DataUnavailable { symbol: String, message: String },

    /// Unexpected detector fault. Increments the named detector's circuit
    /// breaker; the pipeline continues with degraded output.
    #[error("detector '{detector}' failed: {message}")]
    Detector { detector: String, message: String },

    /// Unhandled fault in a background task.
    #[error("internal error: {0}")]
    Internal(String),

    /// A repository or other collaborator call failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl WyckoffError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
