//! # Configuration Module
//!
//! Data directory setup and the runtime settings of a listening session.
//!
//! ## Data Storage
//!
//! Segue keeps its Last.fm session key in the platform-standard data directory:
//! - Linux: `~/.local/share/segue/session.json`
//! - macOS: `~/Library/Application Support/segue/session.json`
//! - Windows: `%APPDATA%\segue\session.json`
//!
//! Nothing else is persisted; the played-track history and aborted artists
//! last for one session only.

use crate::controller::ControllerSettings;
use crate::resolver::ResolverSettings;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Returns the platform-appropriate data directory for Segue, creating it
/// when missing.
///
/// # Errors
///
/// Fails when the system data directory cannot be determined or the
/// `segue` subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let segue_dir = data_dir.join("segue");
    fs::create_dir_all(&segue_dir).with_context(|| {
        format!(
            "Failed to create Segue data directory at {}. Please check file permissions.",
            segue_dir.display()
        )
    })?;

    Ok(segue_dir)
}

/// Path of the stored Last.fm session key.
pub fn get_session_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("session.json"))
}

/// Everything a session needs to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: String,
    pub username: String,
    /// Milliseconds between now-playing updates
    pub tick_interval_ms: u64,
    /// Timeout for every HTTP request
    pub http_timeout_secs: u64,
    #[serde(flatten)]
    pub resolver: ResolverSettings,
    pub search_page_size: u32,
    pub session_file: PathBuf,
}

impl RuntimeConfig {
    /// Build a configuration from command-line credentials.
    ///
    /// A missing username falls back to the `username` environment variable,
    /// which older `.env` files use.
    ///
    /// # Errors
    ///
    /// Fails when a credential is missing or the data directory is unusable.
    pub fn from_credentials(
        api_key: Option<String>,
        api_secret: Option<String>,
        username: Option<String>,
    ) -> Result<Self> {
        let username = username.or_else(|| std::env::var("username").ok());
        Self::with_session_file(api_key, api_secret, username, get_session_path()?)
    }

    /// Same as [`from_credentials`](Self::from_credentials) with an explicit
    /// session file and no environment fallback.
    pub fn with_session_file(
        api_key: Option<String>,
        api_secret: Option<String>,
        username: Option<String>,
        session_file: PathBuf,
    ) -> Result<Self> {
        let api_key = required(api_key, "API key", "--api-key", "LASTFM_API_KEY")?;
        let api_secret = required(api_secret, "API secret", "--api-secret", "LASTFM_API_SECRET")?;
        let username = required(username, "username", "--username", "LASTFM_USERNAME")?;

        Ok(Self {
            api_key,
            api_secret,
            username,
            tick_interval_ms: 1000,
            http_timeout_secs: 10,
            resolver: ResolverSettings::default(),
            search_page_size: 5,
            session_file,
        })
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    #[must_use]
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            tick_interval: self.tick_interval(),
            search_page_size: self.search_page_size,
        }
    }
}

fn required(value: Option<String>, what: &str, flag: &str, env: &str) -> Result<String> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing Last.fm {what}. Pass {flag} or set {env}."))
}
