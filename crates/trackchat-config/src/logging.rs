//! Logging initialization for the client.
//!
//! Structured JSONL goes to `~/.trackchat/logs/client.jsonl`; a compact
//! human-readable copy can also go to stderr. `RUST_LOG` overrides the
//! configured level.

use crate::json_layer::JsonLayer;
use crate::{CoreError, CoreResult};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Options for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Service name written to every JSONL line.
    pub service_name: String,
    /// Default level filter when `RUST_LOG` is unset.
    pub default_level: String,
    /// JSONL output file. `None` disables file output.
    pub log_path: Option<PathBuf>,
    /// Also emit compact logs on stderr.
    pub also_stderr: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            service_name: "trackchat".into(),
            default_level: crate::DEFAULT_LOG_LEVEL.into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Install the global tracing subscriber.
///
/// Fails if the log file cannot be opened or a subscriber is already set.
pub fn init_logging(options: LogOptions) -> CoreResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            EnvFilter::new(parse_level(&options.default_level).to_string().to_lowercase())
        });

    let file_layer = match &options.log_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(JsonLayer::new(options.service_name.clone(), Mutex::new(file)))
        }
        None => None,
    };

    let stderr_layer = options.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| CoreError::Config(format!("failed to install logger: {}", e)))
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
