use serde::Serialize;

use super::report::RecorderState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub recorder: RecorderState,
    /// Live event-stream clients
    pub subscribers: usize,
}

/// Returned once the browser is up and capture is running
#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub session_id: String,
    pub status: RecorderState,
}
