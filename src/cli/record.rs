//! CLI handler for the record command.
//!
//! Starts a session via the HTTP API, then follows `/status` until the
//! session parks in a terminal phase.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

use crate::cli::{service_base_url, RecordCliArgs};

const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Polls tolerated before the session is expected to show as running.
const STARTUP_GRACE_POLLS: u32 = 5;

pub async fn handle_record_command(args: RecordCliArgs) -> Result<()> {
    let base_url = service_base_url();
    let client = reqwest::Client::new();

    let mut body = serde_json::Map::new();
    body.insert("url".to_string(), Value::String(args.url.clone()));
    if let Some(secs) = args.duration_secs {
        body.insert("duration_seconds".to_string(), json!(secs));
    }

    let response = client
        .post(format!("{}/record", base_url))
        .json(&body)
        .send()
        .await
        .context("Failed to connect to meetrec service. Is it running?")?;

    let status = response.status();
    let json: Value = response.json().await?;

    if !status.is_success() {
        bail!(
            "Failed to start recording: {}",
            json.get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error")
        );
    }

    println!("Recording session started for {}", args.url);

    if args.no_wait {
        return Ok(());
    }

    follow_session(&client, &base_url).await
}

async fn follow_session(client: &reqwest::Client, base_url: &str) -> Result<()> {
    let pb = create_progress_bar();
    let mut seen_running = false;
    let mut polls: u32 = 0;

    loop {
        sleep(POLL_INTERVAL).await;
        polls += 1;

        let status: Value = client
            .get(format!("{}/status", base_url))
            .send()
            .await
            .context("Lost connection to meetrec service")?
            .json()
            .await?;

        let running = status
            .get("running")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let phase = status
            .get("phase")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        match status.get("recording_time").and_then(Value::as_str) {
            Some(elapsed) => pb.set_message(format!("{} ({})", phase, elapsed)),
            None => pb.set_message(phase.to_string()),
        }

        if running {
            seen_running = true;
            continue;
        }
        if !seen_running && polls <= STARTUP_GRACE_POLLS {
            continue;
        }

        pb.finish_and_clear();
        if phase == "completed" {
            let output = status
                .get("output_path")
                .and_then(Value::as_str)
                .unwrap_or("output.mp4");
            println!("Recording saved to {}", output);
            return Ok(());
        }
        bail!(
            "Recording failed: {}",
            status
                .get("last_error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
        );
    }
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
