//! trustgate sidecar
//!
//! Hosts the trust layer for one embedded browser session over loopback HTTP.
//!
//! # Architecture Overview
//!
//! ```text
//!   Embedded shell                 ┌──────────────────────────────────────────┐
//!   ─────────────── form submit ──▶│ http ──▶ gate ──▶ token / rate limit /   │
//!                                  │                   sanitize / validate    │
//!   ─────────────── page events ──▶│ http ──▶ monitor                         │
//!                                  │              │           │               │
//!                                  │              ▼           ▼               │
//!   Operator ◀──── admin API ──────│ admin ◀── audit log ──▶ persistent store │
//!                                  └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use trustgate::config::loader::{load_config, ConfigError};
use trustgate::config::validation::validate_config;
use trustgate::config::watcher::ConfigWatcher;
use trustgate::lifecycle::signals::wait_for_shutdown_signal;
use trustgate::observability::{logging, metrics};
use trustgate::session::PageContext;
use trustgate::storage::{FileStore, KeyValueStore, MemoryStore};
use trustgate::{GuardConfig, GuardServer, Shutdown, TrustLayer};

#[derive(Parser)]
#[command(name = "trustgate", version, about = "Trust and abuse-mitigation sidecar")]
struct Args {
    /// Path to a TOML configuration file. Watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let config = GuardConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "trustgate starting");

    tracing::info!(
        bind_address = %config.server.bind_address,
        max_attempts = config.gate.max_attempts,
        window_secs = config.gate.window_secs,
        audit_capacity = config.audit.capacity,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let persistent: Arc<dyn KeyValueStore> = match FileStore::open(&config.storage.persistent_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(
                path = %config.storage.persistent_path,
                error = %e,
                "Persistent store unavailable, audit trail will not survive restart"
            );
            Arc::new(MemoryStore::new())
        }
    };

    let layer = TrustLayer::new(
        Arc::new(MemoryStore::new()),
        persistent,
        PageContext::new(config.page.initial_url.clone(), config.page.agent.clone()),
        config.audit.capacity,
    );
    tracing::info!(session_id = %layer.session.id(), "Session started");

    // Keep the watcher alive for the life of the process.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => (None, mpsc::unbounded_channel().1),
    };

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_shutdown.trigger();
    });

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = GuardServer::new(config, layer);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
