//! CLI handler for the screenshot command.

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::cli::service_base_url;

pub async fn handle_screenshot_command() -> Result<()> {
    let base_url = service_base_url();
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/screenshot", base_url))
        .send()
        .await
        .context("Failed to connect to meetrec service. Is it running?")?;

    let status = response.status();
    let json: Value = response.json().await?;

    if !status.is_success() {
        bail!(
            "Failed to take screenshot: {}",
            json.get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error")
        );
    }

    println!(
        "Screenshot saved to {}",
        json.get("path").and_then(Value::as_str).unwrap_or("?")
    );

    Ok(())
}
