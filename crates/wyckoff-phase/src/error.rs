//! Error type for the phase classifier.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("no bars supplied for phase classification")]
    EmptyBars,
}
