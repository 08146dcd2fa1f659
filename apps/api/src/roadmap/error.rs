use thiserror::Error;

use crate::llm_client::LlmError;
use crate::roadmap::store::StoreError;

/// Every way a roadmap operation can fail. None of them leave the
/// controller's state partially updated.
#[derive(Debug, Error)]
pub enum RoadmapError {
    #[error("Roadmap template '{0}' does not exist")]
    NotFound(String),

    #[error("Step {0} is not part of the current roadmap")]
    InvalidStep(u32),

    #[error("No roadmap has been selected yet")]
    NoActiveRoadmap,

    #[error("Roadmap storage failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("Personalization request failed: {0}")]
    Generation(#[from] LlmError),

    #[error("Personalization response was unusable: {0}")]
    MalformedResponse(String),

    #[error("The session ended before the update was saved")]
    SessionEnded,
}

impl RoadmapError {
    /// The recoverable personalization failures; the user can simply retry.
    pub fn is_personalization_failure(&self) -> bool {
        matches!(
            self,
            RoadmapError::Generation(_) | RoadmapError::MalformedResponse(_)
        )
    }
}
