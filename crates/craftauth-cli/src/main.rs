//! craftauth - log in to a Minecraft account from the command line.
//!
//! Restores the saved login from the Minecraft directory when it is still
//! valid, otherwise asks for credentials. The launcher session argument is
//! printed to stdout; everything else goes to stderr.

mod app;
mod config;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, Cli};
use config::Config;

/// Log file name prefix when `--log-dir` is given
const LOG_FILE_PREFIX: &str = "craftauth.log";

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
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

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse(std::env::args().skip(1))?;

    let _guard = init_tracing(cli.log_dir.as_deref());
    info!("craftauth starting");

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    if config.ensure_client_token() {
        if let Err(e) = config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    let minecraft_dir = cli
        .minecraft_dir
        .clone()
        .unwrap_or_else(|| config.minecraft_dir());
    info!(minecraft_dir = %minecraft_dir.display(), "Using Minecraft directory");

    // The auth service blocks on network I/O; keep it off the runtime threads.
    let app = App::new(config, minecraft_dir);
    tokio::task::spawn_blocking(move || app.run(cli.command))
        .await
        .context("Auth task failed")??;

    info!("craftauth done");
    Ok(())
}
