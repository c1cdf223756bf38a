//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Login endpoint rejected the identifier/secret
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Caller input rejected before any network call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Protected endpoint rejected the attached access credential (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Refresh endpoint rejected the refresh credential
    #[error("Refresh credential rejected: {0}")]
    RefreshRejected(String),

    /// Refresh could not produce a new access credential; the session is over
    #[error("Session expired: {0}")]
    RefreshFailed(String),

    /// Refresh retries exhausted
    #[error("Token refresh failed after {0} attempts")]
    RefreshExhausted(u32),

    /// Backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Backend answered with a body we could not use
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid state transition in the refresh FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] trackchat_storage::StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,
}

/// Coarse classification of failures, used to decide who handles them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Access credential rejected. The dispatcher refreshes and retries once.
    Unauthorized,
    /// Terminal session error. Credentials are gone; the user must log in again.
    RefreshFailed,
    /// Anything else. Propagated to the caller, never retried here.
    NetworkOrOther,
}

impl AuthError {
    /// Map this error onto the three-way failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            AuthError::Unauthorized(_) => FailureKind::Unauthorized,
            AuthError::RefreshFailed(_)
            | AuthError::RefreshRejected(_)
            | AuthError::RefreshExhausted(_) => FailureKind::RefreshFailed,
            _ => FailureKind::NetworkOrOther,
        }
    }

    /// Returns true if the backend rejected the attached access credential.
    pub fn is_unauthorized(&self) -> bool {
        self.kind() == FailureKind::Unauthorized
    }

    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Timeouts
    /// - Connection failures
    /// - 5xx answers
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Timeout => true,
            AuthError::Status { status, .. } => *status >= 500,
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_unauthorized() {
        let err = AuthError::Unauthorized("expired".to_string());
        assert_eq!(err.kind(), FailureKind::Unauthorized);
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_kind_refresh_failures() {
        assert_eq!(
            AuthError::RefreshFailed("no refresh credential".to_string()).kind(),
            FailureKind::RefreshFailed
        );
        assert_eq!(
            AuthError::RefreshRejected("token_not_valid".to_string()).kind(),
            FailureKind::RefreshFailed
        );
        assert_eq!(
            AuthError::RefreshExhausted(3).kind(),
            FailureKind::RefreshFailed
        );
    }

    #[test]
    fn test_kind_other() {
        assert_eq!(AuthError::Timeout.kind(), FailureKind::NetworkOrOther);
        assert_eq!(
            AuthError::Status {
                status: 403,
                message: "forbidden".to_string()
            }
            .kind(),
            FailureKind::NetworkOrOther
        );
        assert!(!AuthError::InvalidCredentials("nope".to_string()).is_unauthorized());
    }

    #[test]
    fn test_is_transient_timeout() {
        assert!(AuthError::Timeout.is_transient());
    }

    #[test]
    fn test_is_transient_server_error_status() {
        let err = AuthError::Status {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_is_not_transient_client_error_status() {
        let err = AuthError::Status {
            status: 400,
            message: "bad request".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_is_not_transient_refresh_rejected() {
        assert!(!AuthError::RefreshRejected("revoked".to_string()).is_transient());
    }

    #[test]
    fn test_is_not_transient_unauthorized() {
        assert!(!AuthError::Unauthorized("expired".to_string()).is_transient());
    }

    #[test]
    fn test_status_display() {
        let err = AuthError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }
}
