//! ResearchHub CLI - workspaces, paper search and chat from the terminal.
//!
//! Every invocation restores the saved session first, so commands that need
//! a signed-in user can run without logging in again.

mod commands;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use researchhub_core::ApiError;

use commands::{App, ChatAction, PaperAction, WorkspaceAction};

/// Directory for daily log files. Unset means stderr only.
const LOG_DIR_ENV: &str = "RESEARCHHUB_LOG_DIR";

const LOG_FILE_PREFIX: &str = "researchhub.log";

#[derive(Parser)]
#[command(name = "researchhub")]
#[command(about = "ResearchHub client - workspaces, paper search and chat", long_about = None)]
struct Cli {
    /// API base URL, overriding config and environment
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
    },
    /// Sign in
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out and forget the saved credential
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage workspaces
    Workspaces {
        #[command(subcommand)]
        action: WorkspaceAction,
    },
    /// Search, import and manage papers
    Papers {
        #[command(subcommand)]
        action: PaperAction,
    },
    /// Chat with a workspace's papers
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// A rejected credential was already reported by the session listener.
fn is_session_expiry(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_unauthorized)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Flushes the log file on exit.
    let _log_guard = init_tracing();
    info!("ResearchHub CLI starting");

    let mut app = App::start(cli.api_url).await?;

    let result = match cli.command {
        Commands::Register { email, username } => {
            commands::auth::register(&mut app, email, username).await
        }
        Commands::Login { email } => commands::auth::login(&mut app, email).await,
        Commands::Logout => commands::auth::logout(&mut app),
        Commands::Whoami => commands::auth::whoami(&app),
        Commands::Workspaces { action } => commands::workspaces::run(&app, action).await,
        Commands::Papers { action } => commands::papers::run(&app, action).await,
        Commands::Chat { action } => commands::chat::run(&app, action).await,
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if is_session_expiry(&e) => Ok(ExitCode::FAILURE),
        Err(e) => Err(e),
    }
}
