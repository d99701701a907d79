use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{
    RecorderState, RecordingStatus, RecordingSummary, StartRecordingRequest,
    StartRecordingResponse,
};
use crate::recording::StartOptions;

use super::super::state::AppState;

/// Launch the browser and begin capturing.
///
/// Fails with 409 while another session is active.
pub async fn start_recording(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRecordingRequest>,
) -> Result<Json<StartRecordingResponse>> {
    if request.url.trim().is_empty() {
        return Err(AppError::InvalidRequest("url must not be empty".to_string()));
    }
    if request.test_name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "test_name must not be empty".to_string(),
        ));
    }

    let mut options = StartOptions::new(
        request.url.trim(),
        request.test_name.trim(),
        state.recorder.config(),
    );
    options.viewport_width = request.viewport_width;
    options.viewport_height = request.viewport_height;
    if let Some(headless) = request.headless {
        options.headless = headless;
    }
    if let Some(dry_run) = request.dry_run {
        options.dry_run = dry_run;
    }

    let session_id = state.recorder.start(options).await?;
    tracing::info!("Recording session {} started", session_id);

    Ok(Json(StartRecordingResponse {
        session_id,
        status: RecorderState::Recording,
    }))
}

/// Stop the active session and generate its artifacts
pub async fn stop_recording(State(state): State<Arc<AppState>>) -> Result<Json<RecordingSummary>> {
    let summary = state.recorder.stop().await?;
    if !summary.is_clean() {
        tracing::warn!(
            "Recording {} stopped with {} error(s)",
            summary.session_id,
            summary.errors.len()
        );
    }
    Ok(Json(summary))
}

pub async fn get_recording_status(State(state): State<Arc<AppState>>) -> Json<RecordingStatus> {
    Json(state.recorder.status().await)
}
