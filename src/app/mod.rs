use crate::api::{ApiCommand, ApiServer};
use crate::browser::{LaunchOptions, WebDriver};
use crate::capture::{AudioSink, CaptureSettings};
use crate::config::{Config, Credentials};
use crate::recorder::{ControllerSettings, RecorderStatusHandle, RecordingController};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn run_service() -> Result<()> {
    info!("Starting meetrec service");

    let config = Config::load()?;

    for tool in ["ffmpeg", "pulseaudio", "chromedriver"] {
        if which::which(tool).is_err() {
            warn!("{} not found in PATH; recording sessions may fail", tool);
        }
    }

    let credentials = Credentials::from_env().ok();
    if credentials.is_none() {
        warn!("GMAIL/GPASS not set; sign-in will fail until they are exported");
    }

    let (tx, mut rx) = mpsc::channel::<ApiCommand>(10);

    let browser = WebDriver::new(config.browser.webdriver_url.clone());
    let audio_sink = AudioSink::new(
        &config.audio.sink_name,
        Duration::from_secs(config.audio.setup_timeout_seconds),
    );
    let capture_settings = CaptureSettings::from_config(&config.capture, &config.audio);

    let status = RecorderStatusHandle::default();
    let controller = Arc::new(RecordingController::new(
        Box::new(browser),
        audio_sink,
        capture_settings,
        ControllerSettings {
            launch: LaunchOptions {
                window_width: config.browser.window_width,
                window_height: config.browser.window_height,
                incognito: true,
            },
            identity_url: config.signin.identity_url.clone(),
            credentials,
            element_timeout: Duration::from_secs(config.browser.element_timeout_seconds),
            default_duration: Duration::from_secs(config.recording.duration_seconds),
        },
        status.clone(),
    ));

    let api_server = ApiServer::new(tx, status.clone(), &config);
    let port = config.api.port;
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    info!("meetrec is ready!");
    info!(
        "Start a recording: curl -X POST http://127.0.0.1:{}/record \
         -H 'content-type: application/json' \
         -d '{{\"url\": \"https://meet.google.com/abc-defg-hij\"}}'",
        port
    );

    while let Some(command) = rx.recv().await {
        match command {
            ApiCommand::Record { meet_link, options } => {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    match controller.record_meet(&meet_link, options).await {
                        Ok(path) => info!("Recording saved to {:?}", path),
                        Err(e) => error!("Recording session failed: {}", e),
                    }
                });
            }
            ApiCommand::Screenshot { reply } => {
                let result = controller.screenshot().await;
                let _ = reply.send(result);
            }
        }
    }

    Ok(())
}
