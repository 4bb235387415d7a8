//! Mini Cache - A lightweight in-memory cache server
//!
//! Binary entry point: wires configuration, persistence, background tasks
//! and the TCP server together.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_cache::{
    spawn_snapshot_task, spawn_sweeper, Cache, CacheServer, Config, Snapshotter, WriteLog,
};

/// Main entry point for the Mini Cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Create the cache engine and restore the latest snapshot
/// 4. Start the expiry sweeper and snapshot tasks
/// 5. Accept connections until SIGINT/SIGTERM
/// 6. Wait for open connections, stop background tasks and write a final snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mini Cache Server");

    let config = Config::from_env();
    config.validate().context("invalid configuration")?;
    info!(
        "Configuration loaded: capacity={}, ttl={}s, strategy={}, addr={}, snapshot_interval={}s, sweep_interval={}s",
        config.cache.capacity,
        config.cache.ttl.as_secs(),
        config.cache.strategy,
        config.network.addr(),
        config.persistence.snapshot_interval.as_secs(),
        config.sweep_interval.as_secs(),
    );

    let cache = Arc::new(
        Cache::from_options(&config.cache)
            .with_write_log(WriteLog::new(&config.persistence.write_log_path)),
    );
    let snapshotter = Snapshotter::new(&config.persistence.snapshot_path);

    // A broken snapshot must not keep the server down
    if let Err(e) = snapshotter.load(&cache).await {
        error!(error = %e, "Failed to load snapshot, starting with an empty cache");
    }

    let shutdown = CancellationToken::new();

    let sweeper = spawn_sweeper(cache.clone(), config.sweep_interval, shutdown.clone());
    let snapshot_task = spawn_snapshot_task(
        cache.clone(),
        snapshotter.clone(),
        config.persistence.snapshot_interval,
        shutdown.clone(),
    );

    let server = CacheServer::bind(&config.network, cache.clone())
        .await
        .with_context(|| format!("failed to bind {}", config.network.addr()))?;

    let server_task = tokio::spawn(server.run(shutdown.clone()));

    shutdown_signal().await;
    shutdown.cancel();

    // Returns once open connections finish or the drain timeout elapses
    if let Err(e) = server_task.await {
        warn!("Server task ended abnormally: {}", e);
    }
    sweeper.join().await;
    if let Err(e) = snapshot_task.await {
        warn!("Snapshot task ended abnormally: {}", e);
    }

    if let Err(e) = snapshotter.save(&cache).await {
        error!(error = %e, "Final snapshot failed");
    }

    let stats = cache.stats().await;
    info!(
        entries = stats.total_entries,
        hit_rate = stats.hit_rate(),
        "Server shutdown complete ({})",
        stats
    );

    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
}
