//! roomhub - command-line client for the room-listing backend.
//!
//! Browse rooms, apply for them, and manage applications. The session is
//! kept between runs (file or keyring, per the `storage` config field),
//! so `login` only needs to happen once.

mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;
use roomhub_core::{App, Config};

/// Log file name prefix when `--log-dir` is given
const LOG_FILE: &str = "roomhub.log";

/// Browse rooms and manage room applications.
#[derive(Parser, Debug)]
#[command(name = "roomhub", version)]
#[command(about = "Browse rooms and manage room applications")]
struct Cli {
    /// Backend base URL (overrides config and ROOMHUB_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Also write logs to a daily-rotated file in this directory
    #[arg(long, global = true, env = "ROOMHUB_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=roomhub_core=debug).
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
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
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_ref());
    info!("roomhub starting");

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_url = Some(url);
    }
    debug!(api_url = %config.api_url(), storage = ?config.storage, "Config loaded");

    let mut app = App::new(config)?;
    app.start();

    commands::run(&mut app, cli.command).await
}
