//! Recorder status types and shared state handle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::RecorderError;

/// Phase of a recording session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderPhase {
    Idle,
    PreparingAudio,
    SigningIn,
    Joining,
    Recording,
    Leaving,
    Completed,
    Error,
}

impl RecorderPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PreparingAudio => "preparing_audio",
            Self::SigningIn => "signing_in",
            Self::Joining => "joining",
            Self::Recording => "recording",
            Self::Leaving => "leaving",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// A session occupies the controller from the atomic begin until it
    /// parks in a terminal phase.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Completed | Self::Error)
    }
}

/// Current recorder state, readable by API handlers.
#[derive(Debug, Clone)]
pub struct RecorderState {
    pub phase: RecorderPhase,
    pub session_id: Option<Uuid>,
    pub meet_link: Option<String>,
    /// Set while the capture window is open.
    pub started_at: Option<DateTime<Utc>>,
    /// True while the meeting page is live (between join and leave).
    pub in_meeting: bool,
    pub output_path: Option<PathBuf>,
    pub last_error: Option<String>,
}

impl Default for RecorderState {
    fn default() -> Self {
        Self {
            phase: RecorderPhase::Idle,
            session_id: None,
            meet_link: None,
            started_at: None,
            in_meeting: false,
            output_path: None,
            last_error: None,
        }
    }
}

impl RecorderState {
    /// Elapsed capture time truncated to whole seconds, `H:MM:SS`.
    pub fn recording_time(&self) -> Option<String> {
        self.started_at.map(|started| {
            let elapsed = Utc::now() - started;
            format_duration(elapsed.num_seconds().max(0) as u64)
        })
    }
}

pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// Thread-safe handle sharing recorder state between the controller and
/// API handlers.
#[derive(Clone, Default)]
pub struct RecorderStatusHandle {
    inner: Arc<Mutex<RecorderState>>,
}

impl RecorderStatusHandle {
    pub async fn get(&self) -> RecorderState {
        self.inner.lock().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.phase.is_active()
    }

    pub async fn recording_time(&self) -> Option<String> {
        self.inner.lock().await.recording_time()
    }

    /// Begin a session: the check and the transition happen under one lock,
    /// so concurrent record requests are rejected deterministically.
    pub async fn try_begin(&self, meet_link: &str) -> Result<Uuid, RecorderError> {
        let mut state = self.inner.lock().await;
        if state.phase.is_active() {
            return Err(RecorderError::AlreadyRunning);
        }
        let session_id = Uuid::new_v4();
        *state = RecorderState {
            phase: RecorderPhase::PreparingAudio,
            session_id: Some(session_id),
            meet_link: Some(meet_link.to_string()),
            ..Default::default()
        };
        Ok(session_id)
    }

    pub async fn set_phase(&self, phase: RecorderPhase) {
        let mut state = self.inner.lock().await;
        state.phase = phase;
    }

    pub async fn set_in_meeting(&self, in_meeting: bool) {
        let mut state = self.inner.lock().await;
        state.in_meeting = in_meeting;
    }

    /// Capture started: open the recording clock.
    pub async fn mark_recording(&self) {
        let mut state = self.inner.lock().await;
        state.phase = RecorderPhase::Recording;
        state.started_at = Some(Utc::now());
    }

    /// Capture window closed: stop the clock and move to the leave step.
    pub async fn leave(&self) {
        let mut state = self.inner.lock().await;
        state.phase = RecorderPhase::Leaving;
        state.started_at = None;
        state.in_meeting = false;
    }

    pub async fn complete(&self, output_path: PathBuf) {
        let mut state = self.inner.lock().await;
        state.phase = RecorderPhase::Completed;
        state.started_at = None;
        state.in_meeting = false;
        state.output_path = Some(output_path);
    }

    pub async fn fail(&self, error: String) {
        let mut state = self.inner.lock().await;
        state.phase = RecorderPhase::Error;
        state.started_at = None;
        state.in_meeting = false;
        state.last_error = Some(error);
    }
}
