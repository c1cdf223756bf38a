//! Single-flight access credential refresh.
//!
//! The first caller to need a refresh moves the machine from `Idle` to
//! `Refreshing` and spawns the refresh task. Everyone arriving while it runs
//! registers a oneshot waiter. When the task finishes it resolves every
//! waiter with the same outcome and returns the machine to `Idle`.

use crate::auth_fsm::{RefreshConfig, RefreshInput, RefreshMachine, RefreshState};
use crate::logout::{LogoutHandler, SessionEndReason};
use crate::transport::AuthTransport;
use crate::{AuthError, AuthResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use trackchat_storage::TokenStore;
use tracing::{debug, info, warn};

/// Fresh access credential, or the reason the session ended.
type RefreshOutcome = Result<String, String>;

struct RefreshSlot {
    fsm: RefreshMachine,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

struct Shared {
    store: Arc<TokenStore>,
    transport: Arc<dyn AuthTransport>,
    logout: Arc<LogoutHandler>,
    config: RefreshConfig,
    slot: Mutex<RefreshSlot>,
}

/// Guarantees at most one outstanding refresh call.
#[derive(Clone)]
pub struct RefreshCoordinator {
    shared: Arc<Shared>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<TokenStore>,
        transport: Arc<dyn AuthTransport>,
        logout: Arc<LogoutHandler>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                transport,
                logout,
                config,
                slot: Mutex::new(RefreshSlot {
                    fsm: RefreshMachine::new(),
                    waiters: Vec::new(),
                }),
            }),
        }
    }

    /// Current machine state.
    pub fn state(&self) -> RefreshState {
        self.shared.slot.lock().fsm.state().clone()
    }

    /// Obtain an access credential newer than `rejected`.
    ///
    /// `rejected` is the credential the backend just refused (`None` if the
    /// call went out unauthenticated). If the store already holds a different
    /// credential and no refresh is running, that credential is returned with
    /// no network call. If the store is empty although the call carried a
    /// credential, the session already ended and this fails without starting
    /// a refresh. Otherwise the caller joins the in-flight refresh or starts
    /// one.
    ///
    /// Fails with [`AuthError::RefreshFailed`] when the refresh fails; by then
    /// credentials are cleared and the logout handler has fired once.
    pub async fn refresh(&self, rejected: Option<&str>) -> AuthResult<String> {
        let receiver = {
            let mut slot = self.shared.slot.lock();
            let (sender, receiver) = oneshot::channel();

            if *slot.fsm.state() == RefreshState::Idle {
                match self.shared.store.access_token() {
                    Some(current) if rejected != Some(current.as_str()) => {
                        debug!("Access credential already replaced, skipping refresh");
                        return Ok(current);
                    }
                    // session ended after this call went out, already signalled
                    None if rejected.is_some() => {
                        debug!("Session ended while the call was in flight");
                        return Err(AuthError::RefreshFailed(
                            "session already ended".to_string(),
                        ));
                    }
                    _ => {}
                }

                slot.fsm
                    .consume(&RefreshInput::RefreshRequested)
                    .map_err(|_| {
                        AuthError::InvalidStateTransition(
                            "Cannot start a refresh outside Idle".to_string(),
                        )
                    })?;
                slot.waiters.push(sender);

                let shared = self.shared.clone();
                tokio::spawn(async move { shared.run().await });
            } else {
                debug!("Refresh in flight, waiting for its result");
                slot.waiters.push(sender);
            }

            receiver
        };

        match receiver.await {
            Ok(Ok(access)) => Ok(access),
            Ok(Err(reason)) => Err(AuthError::RefreshFailed(reason)),
            Err(_) => Err(AuthError::RefreshFailed(
                "refresh task ended without a result".to_string(),
            )),
        }
    }
}

impl Shared {
    async fn run(self: Arc<Self>) {
        let outcome = self.perform().await;

        if let Err(reason) = &outcome {
            // Store is cleared and the signal raised before any waiter resumes.
            self.logout
                .session_ended(SessionEndReason::RefreshFailed(reason.clone()));
        }

        let waiters = {
            let mut slot = self.slot.lock();
            let input = if outcome.is_ok() {
                RefreshInput::RefreshSucceeded
            } else {
                RefreshInput::RefreshFailed
            };
            if slot.fsm.consume(&input).is_err() {
                warn!(state = ?slot.fsm.state(), "Refresh resolved outside Refreshing");
            }
            std::mem::take(&mut slot.waiters)
        };

        debug!(waiters = waiters.len(), "Resolving refresh waiters");
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Run the refresh call with retry on transient errors.
    async fn perform(&self) -> RefreshOutcome {
        let Some(refresh_token) = self.store.refresh_token() else {
            warn!("No refresh credential available");
            return Err("no refresh credential available".to_string());
        };

        let attempts = self.config.attempts();
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                self.retry_transition();
            }

            let call = self.transport.refresh(&refresh_token);
            let result = match tokio::time::timeout(self.config.timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(AuthError::Timeout),
            };

            match result {
                Ok(grant) => {
                    return match self.store.apply_refresh(grant.access, grant.refresh) {
                        Ok(pair) => {
                            info!(attempt = attempt + 1, "Access credential refreshed");
                            Ok(pair.access().to_string())
                        }
                        Err(e) => Err(format!("could not store refreshed credentials: {}", e)),
                    };
                }
                Err(e) if e.is_transient() && attempt + 1 < attempts => {
                    let delay = self.config.delay_for_attempt(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Refresh attempt failed, retrying"
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!(error = %e, "Refresh rejected");
                    return Err(e.to_string());
                }
            }
        }

        warn!(
            attempts,
            error = ?last_error.as_ref().map(|e| e.to_string()),
            "Refresh retries exhausted"
        );
        Err(AuthError::RefreshExhausted(attempts).to_string())
    }

    fn retry_transition(&self) {
        let mut slot = self.slot.lock();
        if slot.fsm.consume(&RefreshInput::RefreshRetry).is_err() {
            warn!(state = ?slot.fsm.state(), "Retry outside Refreshing");
        }
    }
}
