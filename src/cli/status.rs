//! CLI handler for the status command.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::cli::service_base_url;

pub async fn handle_status_command() -> Result<()> {
    let base_url = service_base_url();
    let client = reqwest::Client::new();

    let status: Value = client
        .get(format!("{}/status", base_url))
        .send()
        .await
        .context("Failed to connect to meetrec service. Is it running?")?
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

    if running {
        println!("Session: {}", phase);
        if let Some(link) = status.get("meet_link").and_then(Value::as_str) {
            println!("Meeting: {}", link);
        }
        if let Some(elapsed) = status.get("recording_time").and_then(Value::as_str) {
            println!("Recording time: {}", elapsed);
        }
    } else {
        println!("No recording session in progress (phase: {})", phase);
        if let Some(output) = status.get("output_path").and_then(Value::as_str) {
            println!("Last recording: {}", output);
        }
        if let Some(error) = status.get("last_error").and_then(Value::as_str) {
            println!("Last error: {}", error);
        }
    }

    Ok(())
}
