//! Core configuration, paths, and logging for the trackchat client.

mod config;
mod error;
mod json_layer;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_URL, DEFAULT_CHAT_PATH, DEFAULT_GREETING_PATH, DEFAULT_LOGIN_PATH,
    DEFAULT_LOG_LEVEL, DEFAULT_REFRESH_PATH, DEFAULT_REFRESH_TIMEOUT_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use error::{CoreError, CoreResult};
pub use json_layer::{JsonLayer, LogEntry};
pub use logging::{init_logging, parse_level, LogOptions};
pub use paths::Paths;
