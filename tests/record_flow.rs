//! End-to-end recording flow tests with a scripted browser session.
//!
//! The browser seam is replaced by a mock that records every interaction;
//! the capture and audio-sink collaborators run real (harmless) child
//! processes so the subprocess lifecycle is exercised for real.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use meetrec::browser::{Browser, BrowserSession, Element, LaunchOptions, Locator};
use meetrec::capture::{AudioSink, CaptureSettings};
use meetrec::config::Credentials;
use meetrec::recorder::{
    ControllerSettings, RecordOptions, RecorderError, RecorderPhase, RecorderStatusHandle,
    RecordingController,
};

#[derive(Debug, Default)]
struct MockLog {
    launches: usize,
    visited: Vec<String>,
    clicked: Vec<String>,
    typed: Vec<(String, String)>,
    closed: bool,
    /// Locators whose description contains this string fail to resolve.
    fail_find_containing: Option<String>,
}

#[derive(Clone, Default)]
struct MockBrowser {
    log: Arc<Mutex<MockLog>>,
}

struct MockSession {
    log: Arc<Mutex<MockLog>>,
}

#[async_trait]
impl Browser for MockBrowser {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Arc<dyn BrowserSession>> {
        self.log.lock().unwrap().launches += 1;
        Ok(Arc::new(MockSession {
            log: Arc::clone(&self.log),
        }))
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn goto(&self, url: &str) -> Result<()> {
        self.log.lock().unwrap().visited.push(url.to_string());
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> Result<Element> {
        let description = locator.description();
        let log = self.log.lock().unwrap();
        if let Some(fail) = &log.fail_find_containing {
            if description.contains(fail.as_str()) {
                return Err(anyhow!("no such element: {}", description));
            }
        }
        Ok(Element(description))
    }

    async fn click(&self, element: &Element) -> Result<()> {
        self.log.lock().unwrap().clicked.push(element.0.clone());
        Ok(())
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .typed
            .push((element.0.clone(), text.to_string()));
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        std::fs::write(path, b"\x89PNG")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

const MEET_LINK: &str = "https://meet.google.com/abc-defg-hij";

fn controller_with(
    browser: MockBrowser,
    audio_sink: AudioSink,
    capture_command: &str,
    duration: Duration,
) -> RecordingController {
    RecordingController::new(
        Box::new(browser),
        audio_sink,
        CaptureSettings {
            command: capture_command.to_string(),
            output_path: PathBuf::from("output.mp4"),
            stop_timeout: Duration::from_secs(5),
        },
        ControllerSettings {
            launch: LaunchOptions {
                window_width: 1280,
                window_height: 720,
                incognito: true,
            },
            identity_url: "https://accounts.google.com".to_string(),
            credentials: Some(Credentials {
                email: "bot@example.com".to_string(),
                password: "hunter2".to_string(),
            }),
            element_timeout: Duration::from_secs(1),
            default_duration: duration,
        },
        RecorderStatusHandle::default(),
    )
}

fn quick_sink() -> AudioSink {
    AudioSink::with_command("true".to_string(), Duration::from_secs(5))
}

#[tokio::test]
async fn test_record_meet_happy_path() {
    let browser = MockBrowser::default();
    let controller = controller_with(
        browser.clone(),
        quick_sink(),
        "cat",
        Duration::from_millis(200),
    );

    let path = controller
        .record_meet(MEET_LINK, RecordOptions::default())
        .await
        .unwrap();
    assert_eq!(path, PathBuf::from("output.mp4"));

    let log = browser.log.lock().unwrap();
    assert_eq!(log.launches, 1);
    assert_eq!(
        log.visited,
        vec!["https://accounts.google.com".to_string(), MEET_LINK.to_string()]
    );
    assert_eq!(
        log.clicked,
        vec![
            "element with text \"next\"",
            "element with text \"next\"",
            "element with text \"join now\"",
            "element with text \"leave call\"",
        ]
    );
    assert_eq!(log.typed.len(), 2);
    assert_eq!(log.typed[0].1, "bot@example.com");
    assert_eq!(log.typed[1].1, "hunter2");
    assert!(log.closed);
    drop(log);

    assert!(!controller.is_running().await);
    assert_eq!(controller.recording_time().await, None);
    let state = controller.status().get().await;
    assert_eq!(state.phase, RecorderPhase::Completed);
    assert_eq!(state.output_path, Some(PathBuf::from("output.mp4")));
}

#[tokio::test]
async fn test_concurrent_record_is_rejected() {
    let browser = MockBrowser::default();
    let controller = Arc::new(controller_with(
        browser.clone(),
        quick_sink(),
        "cat",
        Duration::from_millis(600),
    ));

    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            controller
                .record_meet(MEET_LINK, RecordOptions::default())
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(controller.is_running().await);
    let t1 = controller.recording_time().await.unwrap();

    let err = controller
        .record_meet("https://meet.google.com/xyz-wxyz-xyz", RecordOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RecorderError::AlreadyRunning));
    // The rejected call performed no side effects.
    assert_eq!(browser.log.lock().unwrap().launches, 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let t2 = controller.recording_time().await.unwrap();
    assert!(t2 >= t1);

    first.await.unwrap().unwrap();
    assert!(!controller.is_running().await);
}

#[tokio::test]
async fn test_screenshot_gated_on_meeting_page() {
    let browser = MockBrowser::default();
    let controller = Arc::new(controller_with(
        browser.clone(),
        quick_sink(),
        "cat",
        Duration::from_millis(500),
    ));

    // No session yet.
    assert_eq!(controller.screenshot().await.unwrap(), None);

    let task = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            controller
                .record_meet(MEET_LINK, RecordOptions::default())
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    let path = controller.screenshot().await.unwrap().unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("screenshot_"));
    assert!(name.ends_with(".png"));
    let stamp: i64 = name
        .trim_start_matches("screenshot_")
        .trim_end_matches(".png")
        .parse()
        .unwrap();
    assert!((stamp - chrono::Utc::now().timestamp()).abs() < 5);
    assert!(path.exists());
    std::fs::remove_file(&path).ok();

    task.await.unwrap().unwrap();

    // Meeting left: screenshots are unavailable again.
    assert_eq!(controller.screenshot().await.unwrap(), None);
}

#[tokio::test]
async fn test_sink_timeout_fails_before_browser_launch() {
    let browser = MockBrowser::default();
    let slow_sink = AudioSink::with_command("sleep 30".to_string(), Duration::from_millis(100));
    let controller = controller_with(browser.clone(), slow_sink, "cat", Duration::from_millis(100));

    let err = controller
        .record_meet(MEET_LINK, RecordOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RecorderError::Module { module: "pulse" }));

    assert_eq!(browser.log.lock().unwrap().launches, 0);
    assert!(!controller.is_running().await);
    let state = controller.status().get().await;
    assert_eq!(state.phase, RecorderPhase::Error);
    assert!(state.last_error.unwrap().contains("pulse"));
}

#[tokio::test]
async fn test_capture_stop_timeout_still_tears_down_browser() {
    let browser = MockBrowser::default();
    let controller = RecordingController::new(
        Box::new(browser.clone()),
        quick_sink(),
        CaptureSettings {
            command: "sleep 30".to_string(),
            output_path: PathBuf::from("output.mp4"),
            stop_timeout: Duration::from_millis(100),
        },
        ControllerSettings {
            launch: LaunchOptions {
                window_width: 1280,
                window_height: 720,
                incognito: true,
            },
            identity_url: "https://accounts.google.com".to_string(),
            credentials: Some(Credentials {
                email: "bot@example.com".to_string(),
                password: "hunter2".to_string(),
            }),
            element_timeout: Duration::from_secs(1),
            default_duration: Duration::from_millis(100),
        },
        RecorderStatusHandle::default(),
    );

    let err = controller
        .record_meet(MEET_LINK, RecordOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RecorderError::Module { module: "ffmpeg" }));

    // Finalization ran before the capture failure surfaced.
    assert!(browser.log.lock().unwrap().closed);
    assert!(!controller.is_running().await);
    assert_eq!(
        controller.status().get().await.phase,
        RecorderPhase::Error
    );
}

#[tokio::test]
async fn test_browser_failure_mid_join_cleans_up() {
    let browser = MockBrowser::default();
    browser.log.lock().unwrap().fail_find_containing = Some("join now".to_string());
    let controller = controller_with(
        browser.clone(),
        quick_sink(),
        "cat",
        Duration::from_millis(100),
    );

    let err = controller
        .record_meet(MEET_LINK, RecordOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RecorderError::Browser(_)));

    let log = browser.log.lock().unwrap();
    // The session was still closed on the error path.
    assert!(log.closed);
    // Leave was never attempted.
    assert!(!log
        .clicked
        .iter()
        .any(|c| c.contains("leave call")));
    drop(log);

    assert!(!controller.is_running().await);
    let state = controller.status().get().await;
    assert_eq!(state.phase, RecorderPhase::Error);
    assert!(state.last_error.is_some());
}

#[tokio::test]
async fn test_audio_sink_setup_runs_once_across_sessions() {
    let marker = tempfile::NamedTempFile::new().unwrap();
    let sink_command = format!("echo run >> {}", marker.path().display());
    let browser = MockBrowser::default();
    let controller = controller_with(
        browser.clone(),
        AudioSink::with_command(sink_command, Duration::from_secs(5)),
        "cat",
        Duration::from_millis(50),
    );

    controller
        .record_meet(MEET_LINK, RecordOptions::default())
        .await
        .unwrap();
    controller
        .record_meet(MEET_LINK, RecordOptions::default())
        .await
        .unwrap();

    let contents = std::fs::read_to_string(marker.path()).unwrap();
    assert_eq!(contents.lines().count(), 1);
    assert_eq!(browser.log.lock().unwrap().launches, 2);
}

#[tokio::test]
async fn test_duration_override_is_honored() {
    let browser = MockBrowser::default();
    let controller = controller_with(
        browser.clone(),
        quick_sink(),
        "cat",
        // Default would park the test for a minute.
        Duration::from_secs(60),
    );

    let started = std::time::Instant::now();
    controller
        .record_meet(
            MEET_LINK,
            RecordOptions {
                duration: Some(Duration::from_millis(100)),
            },
        )
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));
}
