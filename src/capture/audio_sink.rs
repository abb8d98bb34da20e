//! One-time setup of the virtual audio sink whose monitor feeds the
//! capture process.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::recorder::RecorderError;

pub struct AudioSink {
    command: String,
    setup_timeout: Duration,
    ready: AtomicBool,
}

impl AudioSink {
    pub fn new(sink_name: &str, setup_timeout: Duration) -> Self {
        let command = format!(
            "pulseaudio -D --system=false --exit-idle-time=-1 --disallow-exit \
             && pactl load-module module-null-sink sink_name={sink} \
             && pactl set-default-sink {sink}",
            sink = sink_name
        );
        Self::with_command(command, setup_timeout)
    }

    /// Construct with an explicit setup command.
    pub fn with_command(command: String, setup_timeout: Duration) -> Self {
        Self {
            command,
            setup_timeout,
            ready: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Run the sink setup at most once per process lifetime. The ready flag
    /// is sticky: it never resets after a successful setup.
    pub async fn ensure_ready(&self) -> Result<(), RecorderError> {
        if self.is_ready() {
            return Ok(());
        }

        info!("Setting up virtual audio sink...");
        let child = match Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to spawn audio sink setup: {}", e);
                return Err(RecorderError::Module { module: "pulse" });
            }
        };

        match timeout(self.setup_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.trim().is_empty() {
                    debug!("Audio sink setup stderr: {}", stderr.trim());
                }
                // pactl exits non-zero when the daemon or sink already
                // exists; the sink is still usable, so the exit status is
                // not authoritative.
                self.ready.store(true, Ordering::SeqCst);
                info!("Virtual audio sink ready");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("Failed waiting for audio sink setup: {}", e);
                Err(RecorderError::Module { module: "pulse" })
            }
            Err(_) => {
                error!(
                    "Audio sink setup did not complete within {:?}. Killing it...",
                    self.setup_timeout
                );
                // Dropping the timed-out wait_with_output future drops the
                // child; kill_on_drop reclaims the process.
                Err(RecorderError::Module { module: "pulse" })
            }
        }
    }
}
