//! Recording session orchestrator.
//!
//! Sequences one end-to-end session: audio sink setup → browser launch →
//! sign-in → join → capture → leave → teardown. The browser and both
//! external processes are injected collaborators; teardown runs on every
//! exit path so a failed session never wedges the controller.

use anyhow::{Context, Result};
use chrono::Utc;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::browser::{Browser, BrowserSession, LaunchOptions, Locator};
use crate::capture::{AudioSink, CaptureProcess, CaptureSettings};
use crate::config::Credentials;

use super::{RecorderError, RecorderPhase, RecorderStatusHandle};

const SCREENSHOT_PREFIX: &str = "screenshot_";

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub launch: LaunchOptions,
    pub identity_url: String,
    /// Sign-in credentials; resolved from the environment at record time
    /// when absent.
    pub credentials: Option<Credentials>,
    /// Upper bound for each element readiness wait.
    pub element_timeout: Duration,
    /// Capture window length when the record request carries none.
    pub default_duration: Duration,
}

/// Per-request overrides.
#[derive(Debug, Clone, Default)]
pub struct RecordOptions {
    pub duration: Option<Duration>,
}

pub struct RecordingController {
    browser: Box<dyn Browser>,
    audio_sink: AudioSink,
    capture_settings: CaptureSettings,
    settings: ControllerSettings,
    status: RecorderStatusHandle,
    /// Live browser session, shared so screenshots work mid-recording.
    session: Mutex<Option<Arc<dyn BrowserSession>>>,
}

impl RecordingController {
    pub fn new(
        browser: Box<dyn Browser>,
        audio_sink: AudioSink,
        capture_settings: CaptureSettings,
        settings: ControllerSettings,
        status: RecorderStatusHandle,
    ) -> Self {
        Self {
            browser,
            audio_sink,
            capture_settings,
            settings,
            status,
            session: Mutex::new(None),
        }
    }

    pub fn status(&self) -> &RecorderStatusHandle {
        &self.status
    }

    pub async fn is_running(&self) -> bool {
        self.status.is_running().await
    }

    pub async fn recording_time(&self) -> Option<String> {
        self.status.recording_time().await
    }

    /// Record one meeting end to end, returning the capture output path.
    pub async fn record_meet(
        &self,
        meet_link: &str,
        options: RecordOptions,
    ) -> Result<PathBuf, RecorderError> {
        let session_id = self.status.try_begin(meet_link).await?;
        info!("Recording session {} for {}", session_id, meet_link);

        if !looks_like_meet_link(meet_link) {
            warn!("{} does not look like a Google Meet link", meet_link);
        }

        if let Err(e) = self.audio_sink.ensure_ready().await {
            self.status.fail(e.to_string()).await;
            return Err(e);
        }

        self.status.set_phase(RecorderPhase::SigningIn).await;
        let session = match self.browser.launch(&self.settings.launch).await {
            Ok(session) => session,
            Err(e) => {
                let err = RecorderError::Browser(e.context("Failed to launch browser"));
                self.status.fail(err.to_string()).await;
                return Err(err);
            }
        };
        *self.session.lock().await = Some(Arc::clone(&session));

        let duration = options.duration.unwrap_or(self.settings.default_duration);
        let drive = self.drive_meeting(session.as_ref(), meet_link, duration).await;

        // Teardown runs regardless of how the drive ended: drop the shared
        // session slot and close the browser before finalizing the capture.
        *self.session.lock().await = None;
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {:#}", e);
        }

        match drive {
            Ok(capture) => match capture.stop().await {
                Ok(output_path) => {
                    info!(
                        "Session {} finished, recording saved to {:?}",
                        session_id, output_path
                    );
                    self.status.complete(output_path.clone()).await;
                    Ok(output_path)
                }
                Err(e) => {
                    self.status.fail(e.to_string()).await;
                    Err(e)
                }
            },
            Err(e) => {
                // A capture started mid-sequence was dropped with the error
                // path; kill_on_drop reclaims it.
                self.status.fail(e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Take a screenshot of the live meeting page. `None` when no meeting
    /// page is active.
    pub async fn screenshot(&self) -> Result<Option<PathBuf>> {
        info!("Getting screenshot...");
        if !self.status.get().await.in_meeting {
            return Ok(None);
        }
        let session = self.session.lock().await.clone();
        let Some(session) = session else {
            return Ok(None);
        };

        let path = PathBuf::from(format!(
            "{}{}.png",
            SCREENSHOT_PREFIX,
            Utc::now().timestamp()
        ));
        session.screenshot(&path).await?;
        Ok(Some(path))
    }

    /// Sign in, join, capture for `duration`, then click leave. Returns the
    /// still-running capture process for the caller to finalize.
    async fn drive_meeting(
        &self,
        session: &dyn BrowserSession,
        meet_link: &str,
        duration: Duration,
    ) -> Result<CaptureProcess, RecorderError> {
        self.sign_in(session).await?;

        self.status.set_phase(RecorderPhase::Joining).await;
        self.join_meeting(session, meet_link).await?;
        self.status.set_in_meeting(true).await;

        let capture = CaptureProcess::spawn(&self.capture_settings)?;
        self.status.mark_recording().await;
        info!("Recording for {:?}", duration);
        sleep(duration).await;

        self.status.leave().await;
        if let Err(e) = self.leave_meeting(session).await {
            // The capture window already closed; a missing leave control is
            // not worth discarding a finished recording over.
            warn!("Failed to leave the meeting: {:#}", e);
        }

        Ok(capture)
    }

    async fn sign_in(&self, session: &dyn BrowserSession) -> Result<()> {
        let credentials = self.credentials()?;
        let timeout = self.settings.element_timeout;

        info!("Signing in google account...");
        session
            .goto(&self.settings.identity_url)
            .await
            .context("Failed to open the sign-in page")?;

        let email_field = session
            .wait_for(&Locator::css("input[type=email]"), timeout)
            .await?;
        session
            .type_text(&email_field, &credentials.email)
            .await
            .context("Failed to fill the email field")?;
        let next = session.wait_for(&Locator::text("next"), timeout).await?;
        session
            .click(&next)
            .await
            .context("Failed to advance past the email step")?;

        let password_field = session
            .wait_for(&Locator::css("input[type=password]"), timeout)
            .await?;
        session
            .type_text(&password_field, &credentials.password)
            .await
            .context("Failed to fill the password field")?;
        let next = session.wait_for(&Locator::text("next"), timeout).await?;
        session
            .click(&next)
            .await
            .context("Failed to advance past the password step")?;

        info!("Completed signing in google account.");
        Ok(())
    }

    async fn join_meeting(&self, session: &dyn BrowserSession, meet_link: &str) -> Result<()> {
        session
            .goto(meet_link)
            .await
            .context("Failed to open the meeting page")?;
        let join = session
            .wait_for(&Locator::text("join now"), self.settings.element_timeout)
            .await?;
        session
            .click(&join)
            .await
            .context("Failed to click the join control")?;
        info!("Joined meeting {}", meet_link);
        Ok(())
    }

    async fn leave_meeting(&self, session: &dyn BrowserSession) -> Result<()> {
        let leave = session
            .wait_for(&Locator::text("leave call"), self.settings.element_timeout)
            .await?;
        session
            .click(&leave)
            .await
            .context("Failed to click the leave control")?;
        Ok(())
    }

    fn credentials(&self) -> Result<Credentials> {
        match &self.settings.credentials {
            Some(credentials) => Ok(credentials.clone()),
            None => Credentials::from_env()
                .context("Sign-in credentials missing (set GMAIL and GPASS)"),
        }
    }
}

/// `https://meet.google.com/abc-defg-hij`, with an optional query string.
fn looks_like_meet_link(link: &str) -> bool {
    Regex::new(r"^https://meet\.google\.com/[a-z]{3}-[a-z]{4}-[a-z]{3}(\?.*)?$")
        .map(|re| re.is_match(link))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meet_link_shape() {
        assert!(looks_like_meet_link("https://meet.google.com/abc-defg-hij"));
        assert!(looks_like_meet_link(
            "https://meet.google.com/abc-defg-hij?authuser=0"
        ));
        assert!(!looks_like_meet_link("https://meet.google.com/abcdefghij"));
        assert!(!looks_like_meet_link("http://meet.google.com/abc-defg-hij"));
        assert!(!looks_like_meet_link("https://zoom.us/j/123456"));
    }

    #[test]
    fn test_screenshot_name_is_epoch_stamped() {
        let before = Utc::now().timestamp();
        let name = format!("{}{}.png", SCREENSHOT_PREFIX, Utc::now().timestamp());
        let stamp: i64 = name
            .trim_start_matches(SCREENSHOT_PREFIX)
            .trim_end_matches(".png")
            .parse()
            .unwrap();
        assert!(stamp >= before);
    }
}
