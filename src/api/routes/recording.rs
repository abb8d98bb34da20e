//! Recording control endpoints.
//!
//! - `POST /record` — start a recording session for a meeting link
//! - `GET  /status` — current recorder state
//! - `POST /screenshot` — grab a PNG of the live meeting page

use crate::api::error::ApiError;
use crate::recorder::{RecordOptions, RecorderStatusHandle};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

/// Commands the API sends to the service command loop.
pub enum ApiCommand {
    Record {
        meet_link: String,
        options: RecordOptions,
    },
    Screenshot {
        reply: oneshot::Sender<anyhow::Result<Option<PathBuf>>>,
    },
}

#[derive(Clone)]
pub struct RecordingState {
    pub tx: mpsc::Sender<ApiCommand>,
    pub status: RecorderStatusHandle,
}

#[derive(Debug, Deserialize)]
pub struct RecordRequest {
    pub url: String,
    /// Capture window override in seconds.
    pub duration_seconds: Option<u64>,
}

pub fn router(state: RecordingState) -> Router {
    Router::new()
        .route("/record", post(record_meet))
        .route("/status", get(recording_status))
        .route("/screenshot", post(take_screenshot))
        .with_state(state)
}

async fn record_meet(
    State(state): State<RecordingState>,
    Json(request): Json<RecordRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.url.trim().is_empty() {
        return Err(ApiError::bad_request("url must not be empty"));
    }
    // Friendly early answer; the controller's atomic begin is the real guard.
    if state.status.is_running().await {
        return Err(ApiError::conflict("a recording session is already running"));
    }

    info!("Record command received via API for {}", request.url);

    let options = RecordOptions {
        duration: request.duration_seconds.map(Duration::from_secs),
    };
    state
        .tx
        .send(ApiCommand::Record {
            meet_link: request.url.clone(),
            options,
        })
        .await
        .map_err(|e| ApiError::internal(format!("Failed to dispatch record command: {}", e)))?;

    // Small delay to allow the status to be updated.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = state.status.get().await;
    Ok(Json(json!({
        "success": true,
        "phase": status.phase.as_str(),
        "session_id": status.session_id.map(|id| id.to_string()),
        "meet_link": status.meet_link,
    })))
}

async fn recording_status(State(state): State<RecordingState>) -> Json<Value> {
    let status = state.status.get().await;
    Json(json!({
        "running": status.phase.is_active(),
        "phase": status.phase.as_str(),
        "session_id": status.session_id.map(|id| id.to_string()),
        "meet_link": status.meet_link,
        "in_meeting": status.in_meeting,
        "recording_time": status.recording_time(),
        "output_path": status.output_path,
        "last_error": status.last_error,
    }))
}

async fn take_screenshot(
    State(state): State<RecordingState>,
) -> Result<Json<Value>, ApiError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    state
        .tx
        .send(ApiCommand::Screenshot { reply: reply_tx })
        .await
        .map_err(|e| ApiError::internal(format!("Failed to dispatch screenshot command: {}", e)))?;

    match reply_rx.await {
        Ok(Ok(Some(path))) => Ok(Json(json!({ "success": true, "path": path }))),
        Ok(Ok(None)) => Err(ApiError::conflict("no meeting page is active")),
        Ok(Err(e)) => Err(ApiError::internal(e.to_string())),
        Err(_) => Err(ApiError::internal("screenshot reply channel closed")),
    }
}
