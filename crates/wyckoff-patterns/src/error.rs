//! Error type for the pattern detectors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternsError {
    #[error("invalid bar sequence: {0}")]
    InvalidSequence(String),

    #[error("detector {detector} requires context not provided: {message}")]
    MissingContext { detector: &'static str, message: String },
}
