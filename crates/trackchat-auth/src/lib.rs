//! Authentication for the trackchat client.
//!
//! This crate provides:
//! - Login and logout against the token endpoints
//! - An authenticated dispatcher that refreshes and retries once on HTTP 401
//! - Single-flight refresh shared by every concurrent caller
//! - A navigation signal raised once per ended session
//! - The chat endpoints on top of the dispatcher

mod auth_fsm;
mod chat_client;
mod coordinator;
mod dispatcher;
mod error;
mod http;
mod logout;
mod session;
mod transport;

#[cfg(test)]
mod tests;

pub use auth_fsm::refresh_machine;
pub use auth_fsm::{AuthState, RefreshConfig, RefreshInput, RefreshMachine, RefreshState};
pub use chat_client::{ChatClient, ChatReply};
pub use coordinator::RefreshCoordinator;
pub use dispatcher::{Attempt, AuthenticatedClient};
pub use error::{AuthError, AuthResult, FailureKind};
pub use http::HttpTransport;
pub use logout::{LogoutHandler, NavigationCallback, SessionEndReason, SessionEnded};
pub use session::{SessionConfig, SessionManager};
pub use transport::{ApiRequest, ApiResponse, AuthTransport, Method, TokenGrant};
