//! Trackchat CLI - log in to the trackchat backend and chat with it.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::Context;
use std::path::PathBuf;
use trackchat_config::{init_logging, LogOptions};
use tracing::debug;

/// Trackchat CLI - authenticated chat from the terminal.
#[derive(Parser, Debug)]
#[command(name = "trackchat")]
#[command(about = "Trackchat CLI for login and chat")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also print logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Base directory for config, credentials and logs. Defaults to ~/.trackchat
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Login with username and password
    Login {
        /// Username (prompted if omitted)
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Logout and clear stored credentials
    Logout,

    /// Check authentication status
    Status,

    /// Fetch the greeting from the backend
    Greeting,

    /// Send a chat message, or start an interactive chat
    Chat {
        /// Message to send. Starts an interactive chat when omitted
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (paths, config) = Context::resolve(cli.base_dir.clone())?;

    init_logging(LogOptions {
        service_name: "trackchat-cli".into(),
        default_level: cli
            .log_level
            .clone()
            .unwrap_or_else(|| config.log_level.clone()),
        log_path: Some(paths.log_file()),
        also_stderr: cli.verbose,
    })?;
    debug!(command = ?cli.command, api_url = %config.api_url, "Starting");

    let ctx = Context::open(paths, config)?;

    match cli.command {
        Commands::Login { username } => commands::login(&ctx, username, &cli.format).await?,
        Commands::Logout => commands::logout(&ctx, &cli.format).await?,
        Commands::Status => commands::status(&ctx, &cli.format).await?,
        Commands::Greeting => commands::greeting(&ctx, &cli.format).await?,
        Commands::Chat { message } => commands::chat(&ctx, message, &cli.format).await?,
    }

    Ok(())
}
