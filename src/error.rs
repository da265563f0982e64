//! Error types shared by every component of the tracker.
//!
//! All of these are local, recoverable conditions. The HTTP layer turns
//! them into status codes through the `IntoResponse` impl below.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Missing or out-of-range fields on create / update
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation on an unknown id
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Second completion of the same routine on one calendar day
    #[error("routine {0} was already completed today")]
    AlreadyCompleted(String),

    /// Malformed or incomplete import document
    #[error("invalid import document: {0}")]
    ImportFormat(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    pub fn routine_not_found(id: &str) -> Self {
        TrackerError::NotFound { kind: "routine", id: id.to_string() }
    }

    pub fn task_not_found(id: &str) -> Self {
        TrackerError::NotFound { kind: "task", id: id.to_string() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            TrackerError::Validation(_) | TrackerError::ImportFormat(_) => StatusCode::BAD_REQUEST,
            TrackerError::NotFound { .. } => StatusCode::NOT_FOUND,
            TrackerError::AlreadyCompleted(_) => StatusCode::CONFLICT,
            TrackerError::Storage(_) | TrackerError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;
