use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the recording session state machine
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("A recording is already active")]
    AlreadyRecording,

    #[error("No active recording session")]
    NotRecording,

    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Browser automation error: {0}")]
    Browser(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Failed to write {}: {message}", .path.display())]
    Persistence { path: PathBuf, message: String },
}

/// Evaluation failure inside the selector generator; recovered locally
#[derive(Error, Debug)]
pub enum SelectorError {
    #[error("Failed to describe element: {0}")]
    Describe(String),

    #[error("Failed to resolve selector '{selector}': {message}")]
    Resolve { selector: String, message: String },
}

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Template '{name}' is invalid: {message}")]
    Template { name: String, message: String },

    #[error("Failed to render '{name}': {message}")]
    Render { name: String, message: String },

    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

/// HTTP-facing error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

impl AppError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::Recorder(RecorderError::AlreadyRecording) => {
                (StatusCode::CONFLICT, "already_recording")
            }
            AppError::Recorder(RecorderError::NotRecording) => {
                (StatusCode::NOT_FOUND, "not_recording")
            }
            AppError::Recorder(RecorderError::Launch(_)) => {
                (StatusCode::BAD_GATEWAY, "browser_launch_failed")
            }
            AppError::Recorder(_) => (StatusCode::INTERNAL_SERVER_ERROR, "recording_failed"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = Json(ErrorBody {
            error,
            detail: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_conflicts_map_to_client_errors() {
        let busy = AppError::from(RecorderError::AlreadyRecording).into_response();
        assert_eq!(busy.status(), StatusCode::CONFLICT);

        let idle = AppError::from(RecorderError::NotRecording).into_response();
        assert_eq!(idle.status(), StatusCode::NOT_FOUND);

        let invalid = AppError::InvalidRequest("url must not be empty".to_string()).into_response();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_persistence_error_names_the_path() {
        let err = RecorderError::Persistence {
            path: PathBuf::from("out/tests/login.spec.ts"),
            message: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to write out/tests/login.spec.ts: permission denied"
        );
    }
}
