//! Configuration and settings management
//!
//! Loads settings from environment variables and defines delivery and
//! session tuning constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Optional Instagram login for authenticated extraction
    pub ig_username: Option<String>,
    /// Optional Instagram password for authenticated extraction
    pub ig_password: Option<String>,

    /// Bot token of the delegated large-file relay identity
    pub relay_bot_token: Option<String>,
    /// Bot API endpoint the relay talks to (a self-hosted server for the
    /// 2 GiB ceiling)
    pub relay_api_url: Option<String>,
    /// Command used to launch the relay process
    #[serde(default = "default_relay_command")]
    pub relay_command: String,

    /// Directory downloaded files are materialized into
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

fn default_relay_command() -> String {
    "relay".to_string()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

/// Fully-configured identity of the delegated relay.
///
/// Produced by [`Settings::relay`] only when every required piece is
/// present; the delivery router treats a `None` as a configuration failure
/// for any payload above the direct-upload ceiling.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Bot token the relay authenticates with
    pub bot_token: String,
    /// Bot API endpoint the relay sends through
    pub api_url: String,
    /// Command used to launch the relay process
    pub command: String,
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Environment::default() auto-converts UPPER_SNAKE_CASE to
            // snake_case; ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        // Fallback: check environment variables directly if the automatic
        // mapping did not pick them up
        if settings.relay_bot_token.is_none() {
            if let Ok(val) = std::env::var("RELAY_BOT_TOKEN") {
                if !val.is_empty() {
                    settings.relay_bot_token = Some(val);
                }
            }
        }
        if settings.relay_api_url.is_none() {
            if let Ok(val) = std::env::var("RELAY_API_URL") {
                if !val.is_empty() {
                    settings.relay_api_url = Some(val);
                }
            }
        }
        if settings.ig_username.is_none() {
            if let Ok(val) = std::env::var("IG_USERNAME") {
                if !val.is_empty() {
                    settings.ig_username = Some(val);
                }
            }
        }
        if settings.ig_password.is_none() {
            if let Ok(val) = std::env::var("IG_PASSWORD") {
                if !val.is_empty() {
                    settings.ig_password = Some(val);
                }
            }
        }

        Ok(settings)
    }

    /// Returns the relay identity when it is fully configured.
    ///
    /// Both the relay bot token and the Bot API endpoint must be present;
    /// a partial configuration is treated the same as none at all.
    #[must_use]
    pub fn relay(&self) -> Option<RelaySettings> {
        match (&self.relay_bot_token, &self.relay_api_url) {
            (Some(bot_token), Some(api_url)) => Some(RelaySettings {
                bot_token: bot_token.clone(),
                api_url: api_url.clone(),
                command: self.relay_command.clone(),
            }),
            _ => None,
        }
    }

    /// Directory downloaded files are materialized into
    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }
}

// Delivery configuration
/// Payload ceiling for inline delivery through the bot API (30 MiB)
pub const DIRECT_UPLOAD_LIMIT_BYTES: u64 = 30 * 1024 * 1024;
/// Payload ceiling for the delegated relay (2 GiB)
pub const RELAY_UPLOAD_LIMIT_BYTES: u64 = 2 * 1024 * 1024 * 1024;
/// Bounded wait for one relay process
pub const RELAY_WAIT_TIMEOUT_SECS: u64 = 2 * 60 * 60;

// Format provider configuration
/// Renditions above this known size never reach a selection menu (~1.99 GiB)
pub const RENDITION_SIZE_CEILING_BYTES: u64 = 1990 * 1024 * 1024;
/// Maximum video renditions kept after dedup
pub const MAX_VIDEO_RENDITIONS: usize = 15;
/// Maximum audio renditions kept after dedup
pub const MAX_AUDIO_RENDITIONS: usize = 10;
/// Target bitrate for converted audio
pub const AUDIO_TARGET_BITRATE_KBPS: u32 = 192;
/// Bounded wait for a metadata probe
pub const PROBE_TIMEOUT_SECS: u64 = 90;
/// Bounded wait for a fetch, download and merge included
pub const FETCH_TIMEOUT_SECS: u64 = 60 * 60;

// Conversation configuration
/// Buttons per selection menu, cancel excluded
pub const MAX_MENU_BUTTONS: usize = 10;
/// Idle window after which a session is discarded (15 minutes)
pub const SESSION_IDLE_TIMEOUT_SECS: i64 = 15 * 60;

// Telegram API retry configuration
/// Max attempts for transient Telegram API failures
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff delay
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Backoff ceiling
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
