//! Chat commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use serde_json::json;
use std::io::{self, Write};
use trackchat_auth::{AuthError, AuthState, ChatReply, FailureKind};

/// Commands that leave the interactive chat.
const QUIT_COMMANDS: [&str; 3] = ["/quit", "/exit", "/q"];

fn print_reply(reply: &ChatReply, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", reply.message),
        OutputFormat::Json => println!("{}", json!(reply)),
    }
}

fn print_failure(error: &AuthError, format: &OutputFormat) {
    match error.kind() {
        // the navigation callback already told the user to log in again
        FailureKind::RefreshFailed => {}
        _ => output::print_error(&error.to_string(), format),
    }
}

fn require_login(ctx: &Context, format: &OutputFormat) -> bool {
    if ctx.session.status() == AuthState::NotLoggedIn {
        output::print_error("Not logged in. Run 'trackchat login' first.", format);
        return false;
    }
    true
}

/// Fetch the greeting.
pub async fn greeting(ctx: &Context, format: &OutputFormat) -> Result<()> {
    if !require_login(ctx, format) {
        return Ok(());
    }

    match ctx.session.chat().greeting().await {
        Ok(reply) => print_reply(&reply, format),
        Err(e) => print_failure(&e, format),
    }
    Ok(())
}

/// Send one message, or start an interactive chat when no message is given.
pub async fn chat(ctx: &Context, message: Option<String>, format: &OutputFormat) -> Result<()> {
    if !require_login(ctx, format) {
        return Ok(());
    }
    let chat = ctx.session.chat();

    if let Some(message) = message {
        match chat.send_message(&message).await {
            Ok(reply) => print_reply(&reply, format),
            Err(e) => print_failure(&e, format),
        }
        return Ok(());
    }

    println!("Chatting with {}. Type /quit to leave.", ctx.config.api_url);
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if io::stdin().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let text = line.trim();

        if text.is_empty() {
            continue;
        }
        if QUIT_COMMANDS.contains(&text) {
            break;
        }

        match chat.send_message(text).await {
            Ok(reply) => print_reply(&reply, format),
            Err(e) if e.kind() == FailureKind::RefreshFailed => break,
            Err(e) => print_failure(&e, format),
        }
    }

    Ok(())
}
