use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub signin: SigninConfig,
    pub audio: AudioConfig,
    pub capture: CaptureConfig,
    pub recording: RecordingConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver endpoint driving the browser (chromedriver).
    pub webdriver_url: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Upper bound for element readiness polling.
    pub element_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SigninConfig {
    pub identity_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Name of the null sink whose monitor is captured.
    pub sink_name: String,
    pub setup_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub display: String,
    pub output_path: PathBuf,
    pub framerate: u32,
    pub audio_channels: u32,
    pub audio_bitrate: String,
    pub stop_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Length of the capture window once the meeting is joined.
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://127.0.0.1:9515".to_string(),
            window_width: 1280,
            window_height: 720,
            element_timeout_seconds: 30,
        }
    }
}

impl Default for SigninConfig {
    fn default() -> Self {
        Self {
            identity_url: "https://accounts.google.com".to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sink_name: "virtual_sink".to_string(),
            setup_timeout_seconds: 5,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            display: ":0".to_string(),
            output_path: PathBuf::from("output.mp4"),
            framerate: 30,
            audio_channels: 2,
            audio_bitrate: "192k".to_string(),
            stop_timeout_seconds: 5,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 3600,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3838 }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let mut config = Self::default();
            config.save()?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let mut config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.apply_env_overrides();

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// SCREEN_WIDTH / SCREEN_HEIGHT override the configured browser window size.
    fn apply_env_overrides(&mut self) {
        if let Some(width) = read_env_u32("SCREEN_WIDTH") {
            self.browser.window_width = width;
        }
        if let Some(height) = read_env_u32("SCREEN_HEIGHT") {
            self.browser.window_height = height;
        }
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

fn read_env_u32(name: &str) -> Option<u32> {
    let value = env::var(name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid number", name, value);
            None
        }
    }
}

/// Google account credentials, sourced from the environment only.
/// Never persisted to the config file.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        let email = env::var("GMAIL").context("GMAIL environment variable is not set")?;
        let password = env::var("GPASS").context("GPASS environment variable is not set")?;
        Ok(Self { email, password })
    }
}
