//! Session management: login, logout, status and wiring of the request pipeline.

use crate::auth_fsm::{AuthState, RefreshConfig, RefreshState};
use crate::chat_client::ChatClient;
use crate::coordinator::RefreshCoordinator;
use crate::dispatcher::AuthenticatedClient;
use crate::http::HttpTransport;
use crate::logout::{LogoutHandler, NavigationCallback, SessionEndReason};
use crate::transport::AuthTransport;
use crate::{AuthError, AuthResult};
use std::sync::Arc;
use std::time::Duration;
use trackchat_config::{
    Config, DEFAULT_CHAT_PATH, DEFAULT_GREETING_PATH, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use trackchat_storage::{CredentialPair, TokenStore};
use tracing::{debug, info, warn};

/// Tunables for a [`SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on each attempt of a protected call, and on login.
    pub request_timeout: Duration,
    pub refresh: RefreshConfig,
    pub chat_path: String,
    pub greeting_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            refresh: RefreshConfig::default(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            greeting_path: DEFAULT_GREETING_PATH.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            refresh: RefreshConfig {
                timeout: config.refresh_timeout(),
                ..RefreshConfig::default()
            },
            chat_path: config.chat_path.clone(),
            greeting_path: config.greeting_path.clone(),
        }
    }
}

/// Owns the token store and everything that reads or replaces its contents.
pub struct SessionManager {
    store: Arc<TokenStore>,
    transport: Arc<dyn AuthTransport>,
    logout: Arc<LogoutHandler>,
    coordinator: RefreshCoordinator,
    client: AuthenticatedClient,
    config: SessionConfig,
}

impl SessionManager {
    /// Create a session manager with default tunables.
    pub fn new(store: Arc<TokenStore>, transport: Arc<dyn AuthTransport>) -> Self {
        Self::with_config(store, transport, SessionConfig::default())
    }

    pub fn with_config(
        store: Arc<TokenStore>,
        transport: Arc<dyn AuthTransport>,
        config: SessionConfig,
    ) -> Self {
        let logout = Arc::new(LogoutHandler::new(store.clone()));
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            transport.clone(),
            logout.clone(),
            config.refresh.clone(),
        );
        let client = AuthenticatedClient::new(
            store.clone(),
            transport.clone(),
            coordinator.clone(),
            config.request_timeout,
        );

        Self {
            store,
            transport,
            logout,
            coordinator,
            client,
            config,
        }
    }

    /// Session manager talking HTTP to the configured backend.
    pub fn from_config(config: &Config, store: Arc<TokenStore>) -> AuthResult<Self> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::with_config(
            store,
            Arc::new(transport),
            SessionConfig::from_config(config),
        ))
    }

    /// Exchange an identifier and secret for credentials and store them.
    pub async fn login(&self, identifier: &str, secret: &str) -> AuthResult<()> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(AuthError::InvalidInput("username must not be empty".to_string()));
        }
        if secret.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".to_string()));
        }

        info!(username = %identifier, "Logging in");
        let grant = match tokio::time::timeout(
            self.config.request_timeout,
            self.transport.obtain(identifier, secret),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AuthError::Timeout),
        }
        .map_err(|e| {
            warn!(error = %e, "Login failed");
            e
        })?;

        let refresh = grant.refresh.ok_or_else(|| {
            AuthError::UnexpectedResponse(
                "login response carried no refresh credential".to_string(),
            )
        })?;
        self.store.set(CredentialPair::new(grant.access, refresh))?;

        info!(username = %identifier, "Login successful");
        Ok(())
    }

    /// Clear credentials and signal `LoggedOut`. A no-op when not logged in.
    pub fn logout(&self) -> AuthResult<()> {
        if !self.store.is_present() {
            debug!("Logout requested without a session");
            return Ok(());
        }
        self.logout.session_ended(SessionEndReason::LoggedOut);
        Ok(())
    }

    pub fn status(&self) -> AuthState {
        if self.coordinator.state() == RefreshState::Refreshing {
            return AuthState::Refreshing;
        }
        if self.store.is_present() {
            AuthState::LoggedIn
        } else {
            AuthState::NotLoggedIn
        }
    }

    /// Dispatcher for arbitrary protected calls.
    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    pub fn chat(&self) -> ChatClient {
        ChatClient::new(
            self.client.clone(),
            self.config.chat_path.clone(),
            self.config.greeting_path.clone(),
        )
    }

    /// Register the callback raised when a session ends.
    pub fn set_navigation_callback(&self, callback: NavigationCallback) {
        self.logout.set_navigation_callback(callback);
    }

    pub fn logout_handler(&self) -> &Arc<LogoutHandler> {
        &self.logout
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }
}
