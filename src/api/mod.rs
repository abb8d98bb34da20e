//! REST API server for meetrec.
//!
//! Provides HTTP endpoints for:
//! - Starting a recording session (POST /record)
//! - Recorder status (GET /status)
//! - Meeting-page screenshots (POST /screenshot)

pub mod error;
pub mod routes;

use crate::config::Config;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tracing::info;

pub use routes::recording::{ApiCommand, RecordRequest, RecordingState};

pub struct ApiServer {
    port: u16,
    recording_state: RecordingState,
}

impl ApiServer {
    pub fn new(
        tx: tokio::sync::mpsc::Sender<ApiCommand>,
        status: crate::recorder::RecorderStatusHandle,
        config: &Config,
    ) -> Self {
        Self {
            port: config.api.port,
            recording_state: RecordingState { tx, status },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(status))
            .route("/version", get(version))
            .merge(routes::recording::router(self.recording_state))
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /            - Service info");
        info!("  GET  /version     - Version info");
        info!("  POST /record      - Start a recording session");
        info!("  GET  /status      - Recorder status");
        info!("  POST /screenshot  - Screenshot the live meeting page");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "meetrec",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "meetrec"
    }))
}
