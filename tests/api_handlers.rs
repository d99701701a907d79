//! HTTP handlers driven directly against a scripted recorder.
//!
//! Run with: cargo test --test api_handlers

mod common;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use common::{login_page, login_script, wait_for_actions, MockLauncher};
use playscribe::api::handlers::{health, recording};
use playscribe::api::state::AppState;
use playscribe::config::Config;
use playscribe::models::{RecorderState, StartRecordingRequest};
use playscribe::recording::Recorder;

const LOGIN: &str = "https://app.test/login";

fn app_state(output_dir: &std::path::Path) -> Arc<AppState> {
    let mut config = Config::default();
    config.recording.output_dir = output_dir.to_path_buf();
    let launcher = Arc::new(MockLauncher::new(login_page(LOGIN), login_script(LOGIN)));
    Arc::new(AppState::new(Arc::new(Recorder::new(launcher, config))))
}

fn start_request(url: &str, test_name: &str) -> Json<StartRecordingRequest> {
    Json(
        serde_json::from_value(serde_json::json!({
            "url": url,
            "test_name": test_name,
            "headless": true,
        }))
        .unwrap(),
    )
}

#[tokio::test]
async fn test_start_rejects_blank_fields() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path());

    let err = recording::start_recording(State(state.clone()), start_request("  ", "login"))
        .await
        .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

    let err = recording::start_recording(State(state.clone()), start_request(LOGIN, ""))
        .await
        .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

    assert_eq!(state.recorder.state().await, RecorderState::Idle);
}

#[tokio::test]
async fn test_start_status_stop_round() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path());
    let mut events = state.recorder.subscribe();

    let Json(started) = recording::start_recording(State(state.clone()), start_request(LOGIN, "login"))
        .await
        .unwrap();
    assert_eq!(started.status, RecorderState::Recording);

    let conflict = recording::start_recording(State(state.clone()), start_request(LOGIN, "again"))
        .await
        .unwrap_err();
    assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

    wait_for_actions(&mut events, 4).await;
    let Json(status) = recording::get_recording_status(State(state.clone())).await;
    assert_eq!(status.session_id.as_deref(), Some(started.session_id.as_str()));
    assert_eq!(status.action_count, 4);

    let Json(summary) = recording::stop_recording(State(state.clone())).await.unwrap();
    assert_eq!(summary.session_id, started.session_id);
    assert!(summary.is_clean(), "errors: {:?}", summary.errors);

    let Json(health) = health::health_check(State(state.clone())).await;
    assert_eq!(health.recorder, RecorderState::Idle);
    assert_eq!(health.subscribers, 0);
}

#[tokio::test]
async fn test_stop_when_idle_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path());

    let err = recording::stop_recording(State(state)).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}
