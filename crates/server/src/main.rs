//! Relaychat Server
//!
//! Accepts TCP connections, walks each client through the name handshake,
//! and relays chat lines between all registered clients.

mod registry;
mod server;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use relaychat_core::DEFAULT_ENDPOINT;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Relaychat server - multi-client chat relay over TCP
#[derive(Parser, Debug)]
#[command(name = "relaychat-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chat server relaying messages between connected clients", long_about = None)]
struct Args {
    /// Bind address (host:port)
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    bind: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level)?;

    info!("Starting relaychat server v{}", env!("CARGO_PKG_VERSION"));

    let server = server::ChatServer::bind(&args.bind).await?;
    info!("Server started on {}", args.bind);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let mut server_handle = tokio::spawn(async move { server.run(shutdown_rx).await });

    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("Failed to setup SIGTERM handler")?;

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            let _ = shutdown_tx.send(());
            server_handle.await.context("Server task failed")??;
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
            let _ = shutdown_tx.send(());
            server_handle.await.context("Server task failed")??;
        }
        result = &mut server_handle => {
            result.context("Server task failed")??;
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Setup logging with tracing
fn setup_logging(level: &str) -> Result<()> {
    let log_level = level.parse::<Level>().unwrap_or(Level::INFO);

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
