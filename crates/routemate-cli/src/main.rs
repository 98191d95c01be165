//! RouteMate CLI - a command-line client for the RouteMate route service.
//!
//! Signs in against the server, keeps the session token on disk (or in the
//! OS keychain) between runs, and exposes routes, favorites and comments as
//! subcommands.

mod cli;
mod commands;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use routemate_core::{ApiClient, AuthClient, Config, Navigator, Session};

use cli::Cli;
use commands::Context;

/// Log file name prefix inside `<cache>/logs`
const LOG_FILE_PREFIX: &str = "routemate.log";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.log_to_file.then(|| config.cache_dir()) {
        Some(Ok(dir)) => {
            let appender = tracing_appender::rolling::daily(dir.join("logs"), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Sends the user back to `routemate login` when the server ends the session.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(path = path, "Redirecting to login");
        eprintln!("Your session has expired. Run `routemate login` to sign in again.");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let config = match &cli.api_url {
        Some(url) => config.with_api_url_override(url),
        None => config,
    };

    let _guard = init_tracing(&config);
    if let Some(e) = load_error {
        warn!(error = %e, "Could not load config, using defaults");
    }
    info!(api = %config.api_base_url(), "RouteMate CLI starting");

    let session = Arc::new(Session::new(config.open_store()?));
    session.load_from_persisted();

    let api = ApiClient::from_config(&config, session.clone())?
        .with_navigator(Arc::new(TerminalNavigator));
    let auth = AuthClient::new(api.clone());

    let ctx = Context {
        config,
        session,
        api,
        auth,
    };

    let result = commands::run(&ctx, cli.command).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
