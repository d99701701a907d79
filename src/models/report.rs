use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Result of stopping a recording
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub session_id: String,
    pub test_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_file_path: Option<PathBuf>,
    pub page_object_paths: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
    pub action_count: usize,
    pub step_count: usize,
    pub duration_seconds: f64,
    /// Post-processing and persistence failures; the session still reached idle
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Rendered sources keyed by file name, filled in dry-run mode
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub previews: BTreeMap<String, String>,
}

impl RecordingSummary {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// JSON report persisted next to the generated files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingReport {
    pub test_name: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: f64,
    pub action_count: usize,
    pub files: Vec<PathBuf>,
}

/// Lifecycle state of a recorder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
    Stopping,
}

/// Point-in-time view of a recorder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingStatus {
    pub state: RecorderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
    pub action_count: usize,
    pub elapsed_seconds: f64,
}
