//! CLI command implementations.

mod auth;
mod chat;

pub use auth::{login, logout, status};
pub use chat::{chat, greeting};

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use trackchat_auth::{SessionEndReason, SessionEnded, SessionManager};
use trackchat_config::{Config, Paths};
use trackchat_storage::{FileStorage, TokenStore};

/// Resolved paths, configuration and the session for one CLI invocation.
pub struct Context {
    pub paths: Paths,
    pub config: Config,
    pub session: SessionManager,
}

impl Context {
    /// Resolve paths and load configuration. The session is opened separately
    /// so logging can be installed first.
    pub fn resolve(base_dir: Option<PathBuf>) -> Result<(Paths, Config)> {
        let paths = match base_dir {
            Some(base) => Paths::with_base_dir(base),
            None => Paths::new()?,
        };
        paths.ensure_dirs()?;
        let config = Config::load(&paths)?;
        Ok((paths, config))
    }

    /// Open the persisted credentials and wire the session.
    pub fn open(paths: Paths, config: Config) -> Result<Self> {
        let store = TokenStore::open(Box::new(FileStorage::for_paths(&paths)))?;
        let session = SessionManager::from_config(&config, Arc::new(store))?;
        session.set_navigation_callback(Box::new(on_session_ended));

        Ok(Self {
            paths,
            config,
            session,
        })
    }
}

fn on_session_ended(event: &SessionEnded) {
    if let SessionEndReason::RefreshFailed(reason) = &event.reason {
        eprintln!("Session expired ({}). Run 'trackchat login' to sign in again.", reason);
    }
}
