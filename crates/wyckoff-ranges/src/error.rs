//! Error type for the range and level detector.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RangesError {
    #[error("insufficient bars: need at least {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid bar sequence: {0}")]
    InvalidSequence(String),
}
