//! Background screen+audio capture process.
//!
//! The capture runs detached for the length of the recording window and is
//! stopped by writing `q` to its stdin, the same control channel an
//! interactive ffmpeg session uses. A capture that ignores the stop signal
//! is killed after a bounded wait.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::{AudioConfig, CaptureConfig};
use crate::recorder::RecorderError;

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Shell command line starting the capture.
    pub command: String,
    pub output_path: PathBuf,
    pub stop_timeout: Duration,
}

impl CaptureSettings {
    pub fn from_config(capture: &CaptureConfig, audio: &AudioConfig) -> Self {
        Self {
            command: ffmpeg_command(capture, audio),
            output_path: capture.output_path.clone(),
            stop_timeout: Duration::from_secs(capture.stop_timeout_seconds),
        }
    }
}

/// Render the ffmpeg command line grabbing the X display and the null
/// sink's monitor.
pub fn ffmpeg_command(capture: &CaptureConfig, audio: &AudioConfig) -> String {
    format!(
        "ffmpeg -y -loglevel warning -framerate {fps} -f x11grab -i {display} \
         -f pulse -i {sink}.monitor -ac {channels} -b:a {bitrate} {output}",
        fps = capture.framerate,
        display = capture.display,
        sink = audio.sink_name,
        channels = capture.audio_channels,
        bitrate = capture.audio_bitrate,
        output = capture.output_path.display(),
    )
}

pub struct CaptureProcess {
    child: Child,
    stop_timeout: Duration,
    output_path: PathBuf,
}

impl CaptureProcess {
    /// Spawn the capture in the background. The child is killed on drop, so
    /// an abandoned handle never leaks a recording process.
    pub fn spawn(settings: &CaptureSettings) -> Result<Self, RecorderError> {
        debug!("Starting capture: {}", settings.command);
        let child = match Command::new("sh")
            .arg("-c")
            .arg(&settings.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to spawn capture process: {}", e);
                return Err(RecorderError::Module { module: "ffmpeg" });
            }
        };

        info!("Capture process started with PID {:?}", child.id());

        Ok(Self {
            child,
            stop_timeout: settings.stop_timeout,
            output_path: settings.output_path.clone(),
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Signal the capture to stop and wait for it to exit. On timeout the
    /// process is killed and the failure reported as an ffmpeg module error.
    pub async fn stop(self) -> Result<PathBuf, RecorderError> {
        let Self {
            mut child,
            stop_timeout,
            output_path,
        } = self;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(b"q").await {
                warn!("Failed to send stop signal to capture process: {}", e);
            }
            if let Err(e) = stdin.flush().await {
                warn!("Failed to flush capture stdin: {}", e);
            }
            // stdin drops here; EOF backs up the quit signal.
        }

        debug!("Stop signal sent. Waiting for capture process to exit...");
        match timeout(stop_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.trim().is_empty() {
                    debug!("Capture process stderr: {}", stderr.trim());
                }
                if !output.status.success() {
                    warn!("Capture process exited with status {}", output.status);
                }
                info!("Capture finished: {:?}", output_path);
                Ok(output_path)
            }
            Ok(Err(e)) => {
                error!("Failed waiting for capture process: {}", e);
                Err(RecorderError::Module { module: "ffmpeg" })
            }
            Err(_) => {
                error!(
                    "Capture process did not stop within {:?}. Killing it...",
                    stop_timeout
                );
                // wait_with_output owns the child; dropping the timed-out
                // future kills it via kill_on_drop.
                Err(RecorderError::Module { module: "ffmpeg" })
            }
        }
    }
}
