//! Authenticated request dispatch with one transparent refresh-and-retry.

use crate::coordinator::RefreshCoordinator;
use crate::transport::{ApiRequest, ApiResponse, AuthTransport};
use crate::{AuthError, AuthResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use trackchat_storage::TokenStore;
use tracing::{debug, warn};
use uuid::Uuid;

/// Which send of a logical call this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retried,
}

impl Attempt {
    fn as_str(&self) -> &'static str {
        match self {
            Attempt::First => "first",
            Attempt::Retried => "retried",
        }
    }
}

/// Sends protected calls with the current access credential attached.
///
/// A call rejected as unauthorized on its first attempt goes through the
/// [`RefreshCoordinator`] and is resent once with the new credential. Every
/// other outcome, including a second rejection, is returned as is.
#[derive(Clone)]
pub struct AuthenticatedClient {
    store: Arc<TokenStore>,
    transport: Arc<dyn AuthTransport>,
    coordinator: RefreshCoordinator,
    request_timeout: Duration,
}

impl AuthenticatedClient {
    pub fn new(
        store: Arc<TokenStore>,
        transport: Arc<dyn AuthTransport>,
        coordinator: RefreshCoordinator,
        request_timeout: Duration,
    ) -> Self {
        Self {
            store,
            transport,
            coordinator,
            request_timeout,
        }
    }

    /// Perform one logical call.
    pub async fn execute(&self, request: ApiRequest) -> AuthResult<ApiResponse> {
        let request_id = Uuid::new_v4();
        let access = self.store.access_token();

        match self
            .send_attempt(&request, access.as_deref(), Attempt::First, request_id)
            .await
        {
            Err(e) if e.is_unauthorized() => {
                debug!(
                    request_id = %request_id,
                    path = %request.path(),
                    "Access credential rejected, refreshing"
                );
                let fresh = self.coordinator.refresh(access.as_deref()).await?;
                self.send_attempt(&request, Some(&fresh), Attempt::Retried, request_id)
                    .await
            }
            other => other,
        }
    }

    /// `GET` a protected path.
    pub async fn get(&self, path: &str) -> AuthResult<ApiResponse> {
        self.execute(ApiRequest::get(path)).await
    }

    /// `POST` a JSON body to a protected path.
    pub async fn post_json(&self, path: &str, body: Value) -> AuthResult<ApiResponse> {
        self.execute(ApiRequest::post(path, body)).await
    }

    async fn send_attempt(
        &self,
        request: &ApiRequest,
        access: Option<&str>,
        attempt: Attempt,
        request_id: Uuid,
    ) -> AuthResult<ApiResponse> {
        debug!(
            request_id = %request_id,
            method = request.method().as_str(),
            path = %request.path(),
            attempt = attempt.as_str(),
            authenticated = access.is_some(),
            "Sending request"
        );

        let result =
            match tokio::time::timeout(self.request_timeout, self.transport.send(request, access))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(AuthError::Timeout),
            };

        if let Err(e) = &result {
            warn!(
                request_id = %request_id,
                path = %request.path(),
                attempt = attempt.as_str(),
                error = %e,
                "Request failed"
            );
        }
        result
    }
}
