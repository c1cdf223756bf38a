//! Session teardown and the navigation signal.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use trackchat_storage::TokenStore;
use tracing::{info, warn};

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEndReason {
    /// A refresh operation could not produce a new access credential.
    RefreshFailed(String),
    /// The user logged out.
    LoggedOut,
}

/// Payload of the navigation signal.
#[derive(Debug, Clone)]
pub struct SessionEnded {
    pub reason: SessionEndReason,
    pub at: DateTime<Utc>,
}

/// Callback invoked once per ended session, typically to route the user to login.
pub type NavigationCallback = Box<dyn Fn(&SessionEnded) + Send + Sync>;

/// Clears credentials and raises the navigation signal.
pub struct LogoutHandler {
    store: Arc<TokenStore>,
    callback: Mutex<Option<Arc<dyn Fn(&SessionEnded) + Send + Sync>>>,
    emitted: AtomicU64,
}

impl LogoutHandler {
    pub fn new(store: Arc<TokenStore>) -> Self {
        Self {
            store,
            callback: Mutex::new(None),
            emitted: AtomicU64::new(0),
        }
    }

    /// Replace the navigation callback.
    pub fn set_navigation_callback(&self, callback: NavigationCallback) {
        *self.callback.lock() = Some(Arc::from(callback));
    }

    /// Number of session-ended events raised so far.
    pub fn events_emitted(&self) -> u64 {
        self.emitted.load(Ordering::SeqCst)
    }

    /// End the session: clear credentials, then signal exactly once for this call.
    ///
    /// Clearing is best-effort. A storage failure is logged and the signal
    /// still fires.
    pub fn session_ended(&self, reason: SessionEndReason) -> SessionEnded {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to delete persisted credentials");
        }

        let event = SessionEnded {
            reason,
            at: Utc::now(),
        };
        self.emitted.fetch_add(1, Ordering::SeqCst);

        match &event.reason {
            SessionEndReason::RefreshFailed(reason) => {
                warn!(reason = %reason, "Session ended, login required")
            }
            SessionEndReason::LoggedOut => info!("Logged out"),
        }

        // invoked outside the lock so the callback may replace itself
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback(&event);
        }

        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use trackchat_storage::CredentialPair;

    #[test]
    fn test_session_ended_clears_store() {
        let store = Arc::new(TokenStore::in_memory());
        store.set(CredentialPair::new("A1", "R1")).unwrap();
        let handler = LogoutHandler::new(store.clone());

        let event = handler.session_ended(SessionEndReason::LoggedOut);

        assert_eq!(event.reason, SessionEndReason::LoggedOut);
        assert!(store.get().is_none());
        assert_eq!(handler.events_emitted(), 1);
    }

    #[test]
    fn test_callback_receives_each_event() {
        let store = Arc::new(TokenStore::in_memory());
        let handler = LogoutHandler::new(store);

        let calls = Arc::new(AtomicUsize::new(0));
        let reasons = Arc::new(Mutex::new(Vec::new()));
        {
            let calls = calls.clone();
            let reasons = reasons.clone();
            handler.set_navigation_callback(Box::new(move |event: &SessionEnded| {
                calls.fetch_add(1, Ordering::SeqCst);
                reasons.lock().push(event.reason.clone());
            }));
        }

        handler.session_ended(SessionEndReason::RefreshFailed("rejected".to_string()));
        handler.session_ended(SessionEndReason::LoggedOut);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            *reasons.lock(),
            vec![
                SessionEndReason::RefreshFailed("rejected".to_string()),
                SessionEndReason::LoggedOut
            ]
        );
        assert_eq!(handler.events_emitted(), 2);
    }

    #[test]
    fn test_callback_can_replace_itself() {
        let handler = Arc::new(LogoutHandler::new(Arc::new(TokenStore::in_memory())));
        let replaced = Arc::new(AtomicUsize::new(0));
        {
            let weak = Arc::downgrade(&handler);
            let replaced = replaced.clone();
            handler.set_navigation_callback(Box::new(move |_: &SessionEnded| {
                let Some(handler) = weak.upgrade() else {
                    return;
                };
                let replaced = replaced.clone();
                handler.set_navigation_callback(Box::new(move |_: &SessionEnded| {
                    replaced.fetch_add(1, Ordering::SeqCst);
                }));
            }));
        }

        handler.session_ended(SessionEndReason::LoggedOut);
        assert_eq!(replaced.load(Ordering::SeqCst), 0);

        handler.session_ended(SessionEndReason::LoggedOut);
        assert_eq!(replaced.load(Ordering::SeqCst), 1);
        assert_eq!(handler.events_emitted(), 2);
    }

    #[test]
    fn test_no_callback_registered() {
        let handler = LogoutHandler::new(Arc::new(TokenStore::in_memory()));
        handler.session_ended(SessionEndReason::LoggedOut);
        assert_eq!(handler.events_emitted(), 1);
    }
}
