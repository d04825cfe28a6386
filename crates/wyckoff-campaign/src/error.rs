//! Error type for the campaign detector.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("campaign {0} not found")]
    NotFound(uuid::Uuid),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("admission denied: {0}")]
    AdmissionDenied(String),
}
