//! Authentication commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use serde_json::json;
use std::io::{self, Write};
use trackchat_auth::{AuthError, AuthState};

/// Login with username and password.
pub async fn login(ctx: &Context, username: Option<String>, format: &OutputFormat) -> Result<()> {
    if ctx.session.status() != AuthState::NotLoggedIn {
        output::print_success(
            "Already logged in. Run 'trackchat logout' first to switch accounts.",
            format,
        );
        return Ok(());
    }

    let username = match username {
        Some(username) => username,
        None => {
            print!("Username: ");
            io::stdout().flush()?;
            let mut username = String::new();
            io::stdin().read_line(&mut username)?;
            username
        }
    };
    let username = username.trim().to_string();

    if username.is_empty() {
        output::print_error("Username is required", format);
        return Ok(());
    }

    // Prompt for password (hidden)
    let password = rpassword::prompt_password("Password: ")?;

    if password.is_empty() {
        output::print_error("Password is required", format);
        return Ok(());
    }

    match ctx.session.login(&username, &password).await {
        Ok(()) => output::print_success(&format!("Logged in as {}", username), format),
        Err(AuthError::InvalidCredentials(_)) => {
            output::print_error("Login failed: invalid username or password", format)
        }
        Err(e) => output::print_error(&format!("Login failed: {}", e), format),
    }

    Ok(())
}

/// Logout and clear stored credentials.
pub async fn logout(ctx: &Context, format: &OutputFormat) -> Result<()> {
    if ctx.session.status() == AuthState::NotLoggedIn {
        output::print_success("Not logged in", format);
        return Ok(());
    }

    ctx.session.logout()?;
    output::print_success("Logged out successfully", format);
    Ok(())
}

/// Show authentication status.
pub async fn status(ctx: &Context, format: &OutputFormat) -> Result<()> {
    let state = ctx.session.status();

    match format {
        OutputFormat::Text => {
            output::print_row("Auth", state.as_str());
            output::print_row("API", &ctx.config.api_url);
            output::print_row("Logs", &ctx.paths.log_file().to_string_lossy());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                json!({
                    "state": state,
                    "logged_in": state.is_authenticated(),
                    "api_url": ctx.config.api_url,
                })
            );
        }
    }

    Ok(())
}
