//! Browser automation seam.
//!
//! The controller drives the meeting UI through these traits; the actual
//! browser engine stays an external process behind the WebDriver endpoint.
//! Tests substitute a scripted session.

pub mod webdriver;

pub use webdriver::WebDriver;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How to locate an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector, e.g. `input[type=email]`.
    Css(String),
    /// Case-insensitive visible-text match, e.g. `join now`.
    Text(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn description(&self) -> String {
        match self {
            Self::Css(selector) => format!("element matching `{}`", selector),
            Self::Text(text) => format!("element with text \"{}\"", text),
        }
    }
}

/// Opaque element reference, valid within the session that returned it.
#[derive(Debug, Clone)]
pub struct Element(pub String);

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub window_width: u32,
    pub window_height: u32,
    pub incognito: bool,
}

/// Launches fresh browser sessions.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserSession>>;
}

/// One live browser instance.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn find(&self, locator: &Locator) -> Result<Element>;

    async fn click(&self, element: &Element) -> Result<()>;

    async fn type_text(&self, element: &Element, text: &str) -> Result<()>;

    /// Capture a PNG of the current page to `path`.
    async fn screenshot(&self, path: &Path) -> Result<()>;

    async fn close(&self) -> Result<()>;

    /// Poll `find` until the element appears or the deadline passes.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find(locator).await {
                Ok(element) => return Ok(element),
                Err(err) => {
                    if Instant::now() >= deadline {
                        return Err(err.context(format!(
                            "Timed out after {:?} waiting for {}",
                            timeout,
                            locator.description()
                        )));
                    }
                }
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_description() {
        assert_eq!(
            Locator::css("input[type=email]").description(),
            "element matching `input[type=email]`"
        );
        assert_eq!(
            Locator::text("Join now").description(),
            "element with text \"Join now\""
        );
    }
}
