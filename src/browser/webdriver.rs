//! W3C WebDriver client backing the browser seam.
//!
//! Speaks the wire protocol to a chromedriver endpoint over HTTP. The
//! browser itself remains an external process; this is only the plumbing
//! to reach it.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Method;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{Browser, BrowserSession, Element, LaunchOptions, Locator};

/// W3C element identifier key in WebDriver responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

pub struct WebDriver {
    client: reqwest::Client,
    base_url: String,
}

impl WebDriver {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: reqwest::Client::new(),
            base_url: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Browser for WebDriver {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserSession>> {
        let mut args = vec![format!(
            "--window-size={},{}",
            options.window_width, options.window_height
        )];
        if options.incognito {
            args.push("--incognito".to_string());
        }
        // Meet prompts for mic/camera access; auto-grant so the join flow
        // is not blocked on a native dialog.
        args.push("--use-fake-ui-for-media-stream".to_string());

        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let value = request(
            &self.client,
            Method::POST,
            &format!("{}/session", self.base_url),
            Some(&body),
        )
        .await
        .context("Failed to create WebDriver session")?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("WebDriver new-session response carried no sessionId"))?
            .to_string();

        info!("Browser session {} launched", session_id);

        Ok(Arc::new(WebDriverSession {
            client: self.client.clone(),
            session_url: format!("{}/session/{}", self.base_url, session_id),
            session_id,
        }))
    }
}

pub struct WebDriverSession {
    client: reqwest::Client,
    session_url: String,
    session_id: String,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        request(
            &self.client,
            Method::POST,
            &format!("{}/url", self.session_url),
            Some(&json!({ "url": url })),
        )
        .await
        .with_context(|| format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> Result<Element> {
        let (using, value) = match locator {
            Locator::Css(selector) => ("css selector", selector.clone()),
            Locator::Text(text) => ("xpath", text_xpath(text)),
        };

        let response = request(
            &self.client,
            Method::POST,
            &format!("{}/element", self.session_url),
            Some(&json!({ "using": using, "value": value })),
        )
        .await
        .with_context(|| format!("Failed to find {}", locator.description()))?;

        parse_element(&response)
    }

    async fn click(&self, element: &Element) -> Result<()> {
        request(
            &self.client,
            Method::POST,
            &format!("{}/element/{}/click", self.session_url, element.0),
            Some(&json!({})),
        )
        .await
        .context("Failed to click element")?;
        Ok(())
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<()> {
        request(
            &self.client,
            Method::POST,
            &format!("{}/element/{}/value", self.session_url, element.0),
            Some(&json!({ "text": text })),
        )
        .await
        .context("Failed to type into element")?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let value = request(
            &self.client,
            Method::GET,
            &format!("{}/screenshot", self.session_url),
            None,
        )
        .await
        .context("Failed to request screenshot")?;

        let encoded = value
            .as_str()
            .ok_or_else(|| anyhow!("WebDriver screenshot response was not a string"))?;
        let bytes = BASE64
            .decode(encoded)
            .context("Failed to decode screenshot payload")?;

        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("Failed to write screenshot to {:?}", path))?;

        debug!("Screenshot saved to {:?}", path);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        request(&self.client, Method::DELETE, &self.session_url, None)
            .await
            .with_context(|| format!("Failed to close browser session {}", self.session_id))?;
        info!("Browser session {} closed", self.session_id);
        Ok(())
    }
}

/// Issue one WebDriver request and unwrap the `value` envelope.
async fn request(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<&Value>,
) -> Result<Value> {
    let mut req = client.request(method, url);
    if let Some(body) = body {
        req = req.json(body);
    }

    let response = req
        .send()
        .await
        .with_context(|| format!("WebDriver request to {} failed", url))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .context("Failed to read WebDriver response body")?;

    let parsed: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

    if !status.is_success() {
        let message = parsed
            .pointer("/value/message")
            .and_then(Value::as_str)
            .unwrap_or(text.trim());
        return Err(anyhow!("WebDriver error ({}): {}", status, message));
    }

    Ok(parsed.get("value").cloned().unwrap_or(Value::Null))
}

fn parse_element(value: &Value) -> Result<Element> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| Element(id.to_string()))
        .ok_or_else(|| anyhow!("WebDriver find-element response carried no element id"))
}

/// XPath for a case-insensitive text match against clickable elements.
/// Meet labels some controls via text nodes and others via `aria-label`,
/// so both are matched.
fn text_xpath(text: &str) -> String {
    let needle = text.to_lowercase().replace('\'', "");
    let by_text = format!(
        "contains(translate(normalize-space(.), '{UPPER}', '{LOWER}'), '{needle}')"
    );
    let by_label = format!(
        "contains(translate(@aria-label, '{UPPER}', '{LOWER}'), '{needle}')"
    );
    format!(
        "//button[{by_text} or {by_label}] | //span[{by_text}] | //a[{by_text}] | //*[@role='button'][{by_text} or {by_label}]"
    )
}
