//! Credential Cache - gateway node
//!
//! Serves the proxy authentication path, cache introspection and the admin
//! mutation routes, and keeps its cache in step with its peers.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use credential_cache::api::create_router;
use credential_cache::{spawn_cleanup_task, spawn_invalidation_listener, AppState, Config};

/// Main entry point for a gateway node.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Wire cache, loader, propagator and mutation hooks
/// 4. Start background cleanup and invalidation listener tasks
/// 5. Serve HTTP until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credential_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting credential cache node");

    let config = Config::from_env();
    info!(
        "Configuration loaded: node_id={}, max_entries={}, default_ttl={}s, negative_ttl={}s, port={}, peers={}",
        config.node_id,
        config.max_entries,
        config.default_ttl,
        config.negative_ttl,
        config.server_port,
        config.peers.len()
    );

    let state = AppState::from_config(&config);

    let mut tasks = vec![spawn_cleanup_task(
        state.cache.clone(),
        state.propagator.clone(),
        config.cleanup_interval,
    )];
    if let Some(events) = state.propagator.channel().subscribe() {
        tasks.push(spawn_invalidation_listener(state.propagator.clone(), events));
    }
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts background tasks.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for task in tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}
