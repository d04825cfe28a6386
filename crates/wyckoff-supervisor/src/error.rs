//! Error type for the analysis supervisor.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("run {0} not found")]
    NotFound(Uuid),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("overloaded, retry later: {0}")]
    Overloaded(String),

    #[error("preview runs are disabled")]
    PreviewDisabled,

    #[error("no baseline has been established")]
    NoBaseline,

    #[error("only a PASS regression result is eligible to become a baseline")]
    BaselineNotEligible,
}
