//! Wire-level seam between the auth pipeline and the backend.

use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// HTTP method of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// One logical outbound call against a protected endpoint.
///
/// The request never carries credentials; the dispatcher attaches them per
/// attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, None)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path, Some(body))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Path relative to the API base URL, starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// A successful (2xx) backend answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body, `Null` when the body was empty.
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Decode the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> AuthResult<T> {
        serde_json::from_value(self.body.clone()).map_err(AuthError::from)
    }
}

/// Credentials returned by the login and refresh endpoints.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access: String,
    /// Always present on login; present on refresh only when the server rotates it.
    #[serde(default)]
    pub refresh: Option<String>,
}

impl TokenGrant {
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: access.into(),
            refresh,
        }
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access", &"[REDACTED]")
            .field("refresh", &self.refresh.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Backend operations the auth pipeline depends on.
///
/// Implementations map an HTTP 401 from a protected endpoint to
/// [`AuthError::Unauthorized`] and a rejection from the refresh endpoint to
/// [`AuthError::RefreshRejected`].
#[async_trait]
pub trait AuthTransport: Send + Sync {
    /// Exchange an identifier and secret for a credential pair.
    async fn obtain(&self, identifier: &str, secret: &str) -> AuthResult<TokenGrant>;

    /// Exchange a refresh credential for a new access credential.
    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenGrant>;

    /// Send one attempt of a protected call, with the access credential if any.
    async fn send(&self, request: &ApiRequest, access_token: Option<&str>)
        -> AuthResult<ApiResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_constructors() {
        let get = ApiRequest::get("/api/greeting/");
        assert_eq!(get.method(), Method::Get);
        assert_eq!(get.path(), "/api/greeting/");
        assert!(get.body().is_none());

        let post = ApiRequest::post("/api/chat/", json!({"message": "hi"}));
        assert_eq!(post.method(), Method::Post);
        assert_eq!(post.body(), Some(&json!({"message": "hi"})));
    }

    #[test]
    fn test_token_grant_without_rotation() {
        let grant: TokenGrant = serde_json::from_str(r#"{"access":"A2"}"#).unwrap();
        assert_eq!(grant, TokenGrant::new("A2", None));
    }

    #[test]
    fn test_token_grant_with_rotation() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"access":"A2","refresh":"R2"}"#).unwrap();
        assert_eq!(grant.refresh.as_deref(), Some("R2"));
    }

    #[test]
    fn test_token_grant_debug_redacts() {
        let rendered = format!("{:?}", TokenGrant::new("secret-a", Some("secret-r".into())));
        assert!(!rendered.contains("secret-a"));
        assert!(!rendered.contains("secret-r"));
    }

    #[test]
    fn test_response_json() {
        #[derive(Deserialize)]
        struct Reply {
            message: String,
        }

        let response = ApiResponse::new(200, json!({"message": "hello"}));
        let reply: Reply = response.json().unwrap();
        assert_eq!(reply.message, "hello");

        let empty = ApiResponse::new(204, Value::Null);
        assert!(empty.json::<Reply>().is_err());
    }
}
