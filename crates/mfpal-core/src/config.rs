//! Client and application configuration.
//!
//! `ClientConfig` describes how to reach the identity service and the
//! domain API and which mobile client to present as. `ClientCredentials`
//! holds the app-level OAuth client id/secret. `Config` is the small set of
//! user preferences the CLI remembers between runs, stored at
//! `~/.config/mfpal/config.json`.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "mfpal";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Base URL for the identity service (OAuth, client keys, users)
pub const IDENTITY_BASE_URL: &str = "https://identity-api.myfitnesspal.com";

/// Base URL for the domain API (food, diary, search)
pub const API_BASE_URL: &str = "https://api.myfitnesspal.com";

/// User agent of the Android app the service expects to talk to.
pub const USER_AGENT: &str = "MyFitnessPal/25.19.0 (mfp-mobile-android-google) (Android 11; Pixel 5 / Android Android SDK built for arm64) (preload=false;locale=en_US)";

pub const MFP_CLIENT_ID: &str = "mfp-mobile-android-google";

pub const API_VERSION: &str = "2.0.50";

pub const ACCEPT_LANGUAGE: &str = "en-US";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// App-level OAuth client credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Read `MFP_CLIENT_ID` and `MFP_CLIENT_SECRET` from the environment
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("MFP_CLIENT_ID").context("MFP_CLIENT_ID is not set")?;
        let client_secret =
            std::env::var("MFP_CLIENT_SECRET").context("MFP_CLIENT_SECRET is not set")?;
        Ok(Self::new(client_id, client_secret))
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Transport-level settings for talking to the service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub identity_base_url: String,
    pub api_base_url: String,
    pub user_agent: String,
    pub mfp_client_id: String,
    pub api_version: String,
    pub accept_language: String,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            identity_base_url: IDENTITY_BASE_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            mfp_client_id: MFP_CLIENT_ID.to_string(),
            api_version: API_VERSION.to_string(),
            accept_language: ACCEPT_LANGUAGE.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Defaults, with base URLs overridable through `MFPAL_IDENTITY_URL`
    /// and `MFPAL_API_URL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("MFPAL_IDENTITY_URL") {
            config.identity_base_url = url;
        }
        if let Ok(url) = std::env::var("MFPAL_API_URL") {
            config.api_base_url = url;
        }
        config
    }

    /// Point both services at the same base URL (used against mock servers)
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            identity_base_url: base_url.to_string(),
            api_base_url: base_url.to_string(),
            ..Self::default()
        }
    }
}

/// Preferences the CLI persists between runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
