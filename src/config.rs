//! Configuration and settings management
//!
//! Loads settings from environment variables and defines process-wide
//! constants for the transcription pipeline.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Deepgram API key
    pub deepgram_api_key: String,

    /// Public URL to register with Telegram's `setWebhook` on startup.
    /// When unset the webhook is assumed to be registered out of band.
    pub webhook_url: Option<String>,

    /// Address the HTTP server binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the HTTP server listens on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use scribe_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required secret
    /// (`TELEGRAM_TOKEN`, `DEEPGRAM_API_KEY`) is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from environment variables directly.
            // Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case;
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }
}

/// Maximum media file size accepted for download (Telegram Bot API limit)
pub const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024; // 20 MiB

/// Time-to-live for cached transcription results
pub const CACHE_TTL_SECS: u64 = 24 * 60 * 60; // 24 hours

/// Upper bound on cached entries. The TTL alone does not bound memory under
/// sustained unique traffic, so the cache also evicts entries past this
/// capacity.
pub const CACHE_MAX_CAPACITY: u64 = 10_000;

/// Interval between background cache maintenance sweeps
pub const CACHE_SWEEP_INTERVAL_SECS: u64 = 60 * 60; // 1 hour

/// Deepgram pre-recorded transcription endpoint
pub const DEEPGRAM_API_URL: &str = "https://api.deepgram.com/v1/listen";

/// Deepgram model used for all transcriptions
pub const TRANSCRIPTION_MODEL: &str = "nova-2";

/// Confidence below which the reply carries a low-confidence advisory
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// HTTP timeout for the Deepgram call
pub const DEEPGRAM_HTTP_TIMEOUT_SECS: u64 = 120;

// Telegram API retry policy (file operations only)
/// Initial backoff delay for Telegram file operations
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff delay for Telegram file operations
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Maximum retry attempts for Telegram file operations
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
