//! Refresh state machine using rust-fsm.
//!
//! Only one refresh may be outstanding at a time. The coordinator holds this
//! machine behind a mutex together with its waiter list, so checking for
//! `Idle` and moving to `Refreshing` happen in one critical section.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐  RefreshRequested   ┌─────────────────┐
//! │      Idle       │ ──────────────────► │   Refreshing    │ ◄─┐
//! │    (initial)    │                     └────────┬────────┘   │ RefreshRetry
//! └─────────────────┘                              │ ───────────┘
//!          ▲                                       │
//!          └───── RefreshSucceeded / RefreshFailed ┘
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub refresh_machine(Idle)

    Idle => {
        RefreshRequested => Refreshing
    },
    Refreshing => {
        RefreshRetry => Refreshing,
        RefreshSucceeded => Idle,
        RefreshFailed => Idle
    }
}

pub use refresh_machine::Input as RefreshInput;
pub use refresh_machine::State as RefreshState;
pub use refresh_machine::StateMachine as RefreshMachine;

/// User-facing authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No credentials stored.
    NotLoggedIn,
    /// Credentials stored and no refresh running.
    LoggedIn,
    /// A refresh is in flight.
    Refreshing,
}

impl AuthState {
    /// Returns true if credentials are present.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::LoggedIn | AuthState::Refreshing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::NotLoggedIn => "not_logged_in",
            AuthState::LoggedIn => "logged_in",
            AuthState::Refreshing => "refreshing",
        }
    }
}

/// Configuration for retry behavior during token refresh.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Maximum number of refresh attempts per refresh operation.
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Upper bound on a single refresh call.
    pub timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
            timeout: Duration::from_secs(trackchat_config::DEFAULT_REFRESH_TIMEOUT_SECS),
        }
    }
}

impl RefreshConfig {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .initial_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let capped_ms = delay_ms.min(self.max_delay_ms);
        Duration::from_millis(capped_ms)
    }

    /// Attempts per operation, never fewer than one.
    pub(crate) fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        let machine = RefreshMachine::new();
        assert_eq!(*machine.state(), RefreshState::Idle);
    }

    #[test]
    fn test_refresh_success_flow() {
        let mut machine = RefreshMachine::new();

        machine.consume(&RefreshInput::RefreshRequested).unwrap();
        assert_eq!(*machine.state(), RefreshState::Refreshing);

        machine.consume(&RefreshInput::RefreshSucceeded).unwrap();
        assert_eq!(*machine.state(), RefreshState::Idle);
    }

    #[test]
    fn test_refresh_failure_returns_to_idle() {
        let mut machine = RefreshMachine::new();

        machine.consume(&RefreshInput::RefreshRequested).unwrap();
        machine.consume(&RefreshInput::RefreshRetry).unwrap();
        assert_eq!(*machine.state(), RefreshState::Refreshing);

        machine.consume(&RefreshInput::RefreshFailed).unwrap();
        assert_eq!(*machine.state(), RefreshState::Idle);
    }

    #[test]
    fn test_second_request_while_refreshing_is_rejected() {
        let mut machine = RefreshMachine::new();

        machine.consume(&RefreshInput::RefreshRequested).unwrap();
        assert!(machine.consume(&RefreshInput::RefreshRequested).is_err());
        assert_eq!(*machine.state(), RefreshState::Refreshing);
    }

    #[test]
    fn test_cannot_resolve_from_idle() {
        let mut machine = RefreshMachine::new();

        assert!(machine.consume(&RefreshInput::RefreshSucceeded).is_err());
        assert!(machine.consume(&RefreshInput::RefreshFailed).is_err());
        assert!(machine.consume(&RefreshInput::RefreshRetry).is_err());
        assert_eq!(*machine.state(), RefreshState::Idle);
    }

    #[test]
    fn test_auth_state_serialization() {
        let json = serde_json::to_string(&AuthState::NotLoggedIn).unwrap();
        assert_eq!(json, "\"not_logged_in\"");

        let parsed: AuthState = serde_json::from_str("\"refreshing\"").unwrap();
        assert_eq!(parsed, AuthState::Refreshing);
        assert_eq!(parsed.as_str(), "refreshing");
    }

    #[test]
    fn test_auth_state_is_authenticated() {
        assert!(!AuthState::NotLoggedIn.is_authenticated());
        assert!(AuthState::LoggedIn.is_authenticated());
        assert!(AuthState::Refreshing.is_authenticated());
    }

    #[test]
    fn test_refresh_config_default() {
        let config = RefreshConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 5000);
        assert_eq!(config.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_delay_for_attempt_exponential_backoff() {
        let config = RefreshConfig {
            max_retries: 5,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            timeout: Duration::from_secs(1),
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(800));
        // capped
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(80), Duration::from_millis(1000));
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        let config = RefreshConfig {
            max_retries: 0,
            ..RefreshConfig::default()
        };
        assert_eq!(config.attempts(), 1);
    }
}
