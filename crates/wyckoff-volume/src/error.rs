//! Error type for the volume analyzer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("insufficient data: need {required} bars, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("bars out of order or mixed symbol/timeframe: {0}")]
    InvalidSequence(String),
}
