//! Configuration management for the client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default chat backend URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default credential issuer path.
pub const DEFAULT_LOGIN_PATH: &str = "/api/token/";

/// Default refresh endpoint path.
pub const DEFAULT_REFRESH_PATH: &str = "/api/token/refresh/";

/// Default chat endpoint path.
pub const DEFAULT_CHAT_PATH: &str = "/api/chat/";

/// Default greeting endpoint path.
pub const DEFAULT_GREETING_PATH: &str = "/api/greeting/";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default bound on a single protected call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default bound on a single refresh call.
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 15;

const ENV_LOG_LEVEL: &str = "TRACKCHAT_LOG_LEVEL";
const ENV_API_URL: &str = "TRACKCHAT_API_URL";

/// Main client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL of the chat backend.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Path of the credential issuer (login) endpoint.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Path of the refresh endpoint.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Path of the chat endpoint.
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    /// Path of the greeting endpoint.
    #[serde(default = "default_greeting_path")]
    pub greeting_path: String,
    /// Timeout for one protected call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout for one refresh call, in seconds.
    #[serde(default = "default_refresh_timeout_secs")]
    pub refresh_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_chat_path() -> String {
    DEFAULT_CHAT_PATH.to_string()
}

fn default_greeting_path() -> String {
    DEFAULT_GREETING_PATH.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_refresh_timeout_secs() -> u64 {
    DEFAULT_REFRESH_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_url: default_api_url(),
            login_path: default_login_path(),
            refresh_path: default_refresh_path(),
            chat_path: default_chat_path(),
            greeting_path: default_greeting_path(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_timeout_secs: DEFAULT_REFRESH_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    ///
    /// Environment variables take precedence over the file.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_env(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an environment lookup.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup(ENV_LOG_LEVEL).and_then(non_empty) {
            self.log_level = level;
        }
        if let Some(url) = lookup(ENV_API_URL).and_then(non_empty) {
            self.api_url = url;
        }
    }

    /// Check values that would otherwise fail much later at request time.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_url()?;
        for (name, path) in [
            ("login_path", &self.login_path),
            ("refresh_path", &self.refresh_path),
            ("chat_path", &self.chat_path),
            ("greeting_path", &self.greeting_path),
        ] {
            if !path.starts_with('/') {
                return Err(CoreError::Config(format!(
                    "{} must start with '/': {}",
                    name, path
                )));
            }
        }
        if self.request_timeout_secs == 0 || self.refresh_timeout_secs == 0 {
            return Err(CoreError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the backend URL as a parsed URL.
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_url).map_err(CoreError::from)
    }

    /// Timeout for one protected call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout for one refresh call.
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
