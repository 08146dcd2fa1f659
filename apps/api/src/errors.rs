use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::roadmap::RoadmapError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Messages sent to the client are plain language; details are logged.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Another roadmap update is still in progress")]
    OperationInFlight,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Personalization failed: {0}")]
    Personalization(String),
}

impl From<RoadmapError> for AppError {
    fn from(err: RoadmapError) -> Self {
        if err.is_personalization_failure() {
            return AppError::Personalization(err.to_string());
        }
        match err {
            RoadmapError::InvalidStep(_) => AppError::Validation(err.to_string()),
            RoadmapError::Persistence(e) => AppError::Persistence(e.to_string()),
            RoadmapError::SessionEnded => AppError::Unauthorized,
            // NotFound / NoActiveRoadmap
            _ => AppError::NotFound(err.to_string()),
        }
    }
}

impl AppError {
    /// Whether the same request may succeed if the user simply tries again.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            AppError::OperationInFlight | AppError::Persistence(_) | AppError::Personalization(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Sign in to view your roadmap".to_string(),
            ),
            AppError::OperationInFlight => (
                StatusCode::CONFLICT,
                "OPERATION_IN_FLIGHT",
                "Your previous change is still being saved. Try again in a moment".to_string(),
            ),
            AppError::Persistence(msg) => {
                tracing::error!("Persistence error: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PERSISTENCE_ERROR",
                    "We couldn't save your roadmap. Please try again".to_string(),
                )
            }
            AppError::Personalization(msg) => {
                tracing::warn!("Personalization error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "PERSONALIZATION_FAILED",
                    "We couldn't personalize your roadmap right now. Please try again".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "retryable": self.retryable()
            }
        }));

        (status, body).into_response()
    }
}
