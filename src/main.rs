//! Argus Binary Entry Point
//!
//! Runs the complete monitoring service: store, scheduler, probe catalogue,
//! and the TCP control plane. Core functionality is provided by the `argus`
//! library crate.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use argus::probe::checkers;
use argus::{AppConfig, ControlServer, StoreBuilder, TaskRegistry};

/// Argus - Distributed Network-Diagnostics Monitor
#[derive(Parser, Debug)]
#[command(name = "argus", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "ARGUS_CONFIG")]
    config: Option<String>,

    /// Control-plane bind address (overrides config file)
    #[arg(long, env = "ARGUS_BIND")]
    bind: Option<String>,

    /// Control-plane port (overrides config file)
    #[arg(long, env = "ARGUS_PORT")]
    port: Option<u16>,

    /// Store directory (overrides config file)
    #[arg(long, env = "ARGUS_STORE_DIR")]
    store_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,argus=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Argus - Distributed Network-Diagnostics Monitor");

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file if given, then apply CLI/env overrides
    // (CLI > ENV > config file)
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            AppConfig::load(path)?
        }
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = cli.store_dir {
        config.store.dir = dir;
    }
    config.validate()?;

    tracing::info!(
        "Control plane: {}:{}, Store: {}",
        config.server.bind,
        config.server.port,
        config.store.dir,
    );

    // Build the store layer
    let handles = StoreBuilder::new(&config.store.dir)
        .channel_capacity(config.store.channel_capacity)
        .build()?;
    tracing::info!("Store initialized");

    // Probe catalogue: builtins plus the standard checkers
    let catalogue = Arc::new(checkers::standard_catalogue()?);

    // Task registry over the store writer
    let registry = Arc::new(TaskRegistry::new(handles.writer.clone()));

    // Bind and run the control plane
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let server = ControlServer::bind(addr, Arc::clone(&registry), catalogue).await?;

    tracing::info!("Press Ctrl+C to shutdown");

    tokio::select! {
        _ = server.run() => {}
        _ = shutdown_signal() => {}
    }

    tracing::info!("Stopping tasks...");
    registry.shutdown().await;

    tracing::info!("Shutting down store...");
    if let Err(e) = handles.shutdown() {
        tracing::error!("Failed to shutdown store: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
