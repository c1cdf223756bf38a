//! Chat feature calls on top of the authenticated dispatcher.

use crate::dispatcher::AuthenticatedClient;
use crate::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Text answer from the chat backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
}

#[derive(Clone)]
pub struct ChatClient {
    client: AuthenticatedClient,
    chat_path: String,
    greeting_path: String,
}

impl ChatClient {
    pub fn new(
        client: AuthenticatedClient,
        chat_path: impl Into<String>,
        greeting_path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            chat_path: chat_path.into(),
            greeting_path: greeting_path.into(),
        }
    }

    /// Send one chat message. Surrounding whitespace is trimmed; blank text is rejected.
    pub async fn send_message(&self, text: &str) -> AuthResult<ChatReply> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AuthError::InvalidInput("message must not be empty".to_string()));
        }

        let response = self
            .client
            .post_json(&self.chat_path, json!({ "message": text }))
            .await?;
        response.json()
    }

    pub async fn greeting(&self) -> AuthResult<ChatReply> {
        self.client.get(&self.greeting_path).await?.json()
    }
}
