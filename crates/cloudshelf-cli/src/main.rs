//! cloudshelf - command-line client for the cloudshelf file-storage service.
//!
//! Each subcommand maps to one backend capability. The credential obtained by
//! `login` or `register` is persisted (see `Config::credential_backend`) and
//! attached to every later command.

mod commands;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cloudshelf_core::auth::{CredentialStore, SessionEvent};
use cloudshelf_core::config::{Config, CredentialBackend};
use cloudshelf_core::models::AccessType;
use cloudshelf_core::{ApiClient, ApiError};

#[derive(Debug, Parser)]
#[command(name = "cloudshelf", version, about = "Store, share and organize files")]
struct Cli {
    /// Backend base URL (overrides config and CLOUDSHELF_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Keep the credential in memory only for this run
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an account and log in
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Log in with username and password
    Login {
        #[arg(long)]
        username: Option<String>,
    },
    /// Forget the stored credential
    Logout,
    /// Show whether a credential is stored
    Status,
    /// Show the logged-in account
    Whoami,
    /// List files
    Ls {
        /// Group files by folder
        #[arg(long)]
        tree: bool,
    },
    /// Upload a local file
    Upload {
        path: PathBuf,
        /// Target folder (created if missing)
        #[arg(long)]
        folder: Option<String>,
        /// Name to store the file under (defaults to the local file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Download a file
    Download {
        file_id: i64,
        /// Output path (defaults to the name sent by the backend)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a file
    Rm { file_id: i64 },
    /// Search files
    Search {
        keyword: Option<String>,
        #[arg(long = "type")]
        file_type: Option<String>,
        /// Only files created after this date (YYYY-MM-DD)
        #[arg(long)]
        after: Option<NaiveDate>,
        /// Only files created before this date (YYYY-MM-DD)
        #[arg(long)]
        before: Option<NaiveDate>,
    },
    /// List the versions of a file
    Versions { file_id: i64 },
    /// Restore a previous version of a file
    Rollback { file_id: i64, version: i64 },
    /// Create a folder
    Mkdir {
        name: String,
        #[arg(long)]
        parent: Option<i64>,
    },
    /// List folders
    Folders,
    /// Delete a folder
    Rmdir { folder_id: i64 },
    /// Share a file with another user
    Share {
        file_id: i64,
        /// Username to share with
        user: String,
        #[arg(long, default_value = "shared")]
        access: AccessType,
    },
    /// Show storage usage analytics
    Analytics,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if cli.ephemeral {
        config.credential_backend = CredentialBackend::Memory;
    }
    let base_url = cli.api_url.clone().unwrap_or_else(|| config.base_url());
    debug!(base_url = %base_url, backend = ?config.credential_backend, "Starting");

    let store = Arc::new(config.credential_store()?);
    let mut events = store.subscribe();
    let client = ApiClient::connect(&base_url, Arc::clone(&store))?;

    let result = commands::run(cli.command, &client, &mut config).await;

    // The session layer only reports transitions; deciding where the user
    // goes next is up to us.
    while let Ok(event) = events.try_recv() {
        info!(?event, "Session changed");
        if event == SessionEvent::SessionInvalid {
            eprintln!("Your session has expired. Run `cloudshelf login` to sign in again.");
        }
    }

    if let Err(e) = result {
        if let Some(message) = error_message(&e, &store) {
            eprintln!("{}", message);
        }
        std::process::exit(1);
    }
    Ok(())
}

/// What to print for a failed command, if anything.
fn error_message(err: &anyhow::Error, store: &CredentialStore) -> Option<String> {
    match err.downcast_ref::<ApiError>() {
        // Already reported through the session event.
        Some(ApiError::SessionInvalid) if store.get_token().is_none() => None,
        Some(api_err) => {
            debug!(error = %api_err, "Command failed");
            let mut message = format!("Error: {}", api_err.user_message());
            if api_err.requires_login() {
                message.push_str(" Run `cloudshelf login` to sign in.");
            }
            Some(message)
        }
        None => Some(format!("Error: {:#}", err)),
    }
}
