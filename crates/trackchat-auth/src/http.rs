//! reqwest-backed [`AuthTransport`].

use crate::transport::{ApiRequest, ApiResponse, AuthTransport, Method, TokenGrant};
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use trackchat_config::Config;
use tracing::debug;
use url::Url;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Backend-supplied failure text, or a digest if the body carries none.
fn error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "detail"] {
            if let Some(Value::String(message)) = map.get(key) {
                return message.clone();
            }
        }
    }
    summarize_response_body(body)
}

fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// HTTP transport against the chat backend.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    api_url: String,
    login_path: String,
    refresh_path: String,
}

impl HttpTransport {
    /// Create a transport for the given base URL and credential endpoints.
    pub fn new(api_url: &str, login_path: &str, refresh_path: &str) -> AuthResult<Self> {
        Url::parse(api_url)?;
        Ok(Self {
            http_client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            login_path: login_path.to_string(),
            refresh_path: refresh_path.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> AuthResult<Self> {
        Self::new(&config.api_url, &config.login_path, &config.refresh_path)
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_url, path)
        } else {
            format!("{}/{}", self.api_url, path)
        }
    }

    async fn post_credentials<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> AuthResult<(u16, String)> {
        let response = self
            .http_client
            .post(self.endpoint(path))
            .json(payload)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(
            path = %path,
            status,
            body = %summarize_response_body(&body),
            "Credential endpoint answered"
        );
        Ok((status, body))
    }
}

#[async_trait]
impl AuthTransport for HttpTransport {
    async fn obtain(&self, identifier: &str, secret: &str) -> AuthResult<TokenGrant> {
        let payload = LoginRequest {
            username: identifier,
            password: secret,
        };
        let (status, body) = self.post_credentials(&self.login_path, &payload).await?;

        match status {
            200..=299 => {
                let grant: TokenGrant = serde_json::from_str(&body).map_err(|e| {
                    AuthError::UnexpectedResponse(format!("login response: {}", e))
                })?;
                if grant.refresh.is_none() {
                    return Err(AuthError::UnexpectedResponse(
                        "login response carried no refresh credential".to_string(),
                    ));
                }
                Ok(grant)
            }
            400 | 401 => Err(AuthError::InvalidCredentials(error_message(&body))),
            _ => Err(AuthError::Status {
                status,
                message: error_message(&body),
            }),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenGrant> {
        let payload = RefreshRequest {
            refresh: refresh_token,
        };
        let (status, body) = self.post_credentials(&self.refresh_path, &payload).await?;

        match status {
            200..=299 => serde_json::from_str(&body).map_err(|e| {
                AuthError::UnexpectedResponse(format!("refresh response: {}", e))
            }),
            400 | 401 => Err(AuthError::RefreshRejected(error_message(&body))),
            _ => Err(AuthError::Status {
                status,
                message: error_message(&body),
            }),
        }
    }

    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> AuthResult<ApiResponse> {
        let mut builder = self
            .http_client
            .request(to_reqwest(request.method()), self.endpoint(request.path()));
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(
            method = request.method().as_str(),
            path = %request.path(),
            status,
            authenticated = access_token.is_some(),
            body = %summarize_response_body(&body),
            "Backend answered"
        );

        match status {
            200..=299 => Ok(ApiResponse::new(status, parse_body(&body))),
            401 => Err(AuthError::Unauthorized(error_message(&body))),
            _ => Err(AuthError::Status {
                status,
                message: error_message(&body),
            }),
        }
    }
}
