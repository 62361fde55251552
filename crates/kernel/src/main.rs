//! Sunset kernel
//!
//! HTTP server and maintenance commands for content expiration.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use sunset_kernel::{AppState, Config, routes};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server and the cron loop (default).
    Serve,
    /// Unpublish expired content once and exit.
    Sweep,
    /// Remove the recurring expiration check from the scheduler.
    Deactivate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    let cli = Cli::parse();

    // Load configuration from environment
    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        port = config.port,
        content_type = %config.expiration_content_type,
        "Configuration loaded"
    );

    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state).await,
        Command::Sweep => {
            let report = state.expiration().sweep_now().await?;
            info!(
                examined = report.examined,
                transitioned = report.transitioned.len(),
                "sweep finished"
            );
            Ok(())
        }
        Command::Deactivate => {
            let cleared = state.cron().deactivate().await?;
            if cleared.is_empty() {
                warn!("no scheduled hooks to clear");
            }
            Ok(())
        }
    }
}

async fn serve(state: AppState) -> Result<()> {
    info!("Starting Sunset kernel");

    // Register the recurring check if this is the first boot.
    state
        .cron()
        .activate()
        .await
        .context("failed to schedule recurring hooks")?;

    let cancel = CancellationToken::new();
    let cron_loop = tokio::spawn(
        state
            .cron()
            .clone()
            .run_loop(state.config().cron_poll_interval, cancel.clone()),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config().port));
    let app = routes::app(state);

    info!(%addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    cancel.cancel();
    if let Err(e) = cron_loop.await {
        warn!(error = %e, "cron loop ended abnormally");
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
