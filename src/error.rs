use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub const SLOT_UNAVAILABLE_MESSAGE: &str = "Slot not available.";

/// Errors reported by a [`crate::backend::BookingBackend`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// The slot does not exist or was already booked.
    #[error("Slot not available.")]
    SlotUnavailable,
    #[error("{0} does not exist")]
    NotFound(&'static str),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Storage lock was poisoned")]
    LockPoisoned,
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::SlotUnavailable => (
                StatusCode::BAD_REQUEST,
                json!({ "error": SLOT_UNAVAILABLE_MESSAGE }),
            ),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": self.to_string() })),
            Self::Invalid(_) => (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() })),
            Self::Conflict(_) => (StatusCode::CONFLICT, json!({ "error": self.to_string() })),
            Self::Database(_) | Self::LockPoisoned => {
                error!(err = ?self, "Request failed on storage backend");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for BackendError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Invalid(errors.to_string())
    }
}
