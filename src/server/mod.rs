//! Server Module
//!
//! TCP listener that hands every accepted connection to its own task.

mod connection;

pub use connection::handle_connection;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::cache::Cache;
use crate::config::NetworkSettings;
use crate::error::Result;
use crate::protocol::CommandHandler;

/// Pause after a failed accept so a persistent error does not spin the loop
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How long `run` waits for open connections after shutdown
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// == Cache Server ==
/// Accept loop for the line protocol.
#[derive(Debug)]
pub struct CacheServer {
    listener: TcpListener,
    handler: CommandHandler,
    connections: TaskTracker,
    drain_timeout: Duration,
}

impl CacheServer {
    /// Binds the configured address.
    pub async fn bind(settings: &NetworkSettings, cache: Arc<Cache>) -> Result<Self> {
        let listener = TcpListener::bind(settings.addr()).await?;
        Ok(Self::from_listener(listener, cache))
    }

    /// Wraps an already bound listener.
    pub fn from_listener(listener: TcpListener, cache: Arc<Cache>) -> Self {
        Self {
            listener,
            handler: CommandHandler::new(cache),
            connections: TaskTracker::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Overrides how long shutdown waits for open connections.
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    // == Run ==
    /// Accepts connections until `shutdown` fires.
    ///
    /// The listener is closed as soon as `shutdown` fires. Open connections
    /// are not cut off: `run` returns once their clients disconnect or the
    /// drain timeout elapses, whichever comes first.
    pub async fn run(self, shutdown: CancellationToken) {
        let Self {
            listener,
            handler,
            connections,
            drain_timeout,
        } = self;

        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "Server listening");
        }

        loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    info!(%peer, "New connection");
                    connections.spawn(handle_connection(stream, peer, handler.clone()));
                }
                Err(e) => {
                    warn!(error = %e, "Accept error");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }

        drop(listener);
        connections.close();
        info!(
            open = connections.len(),
            "Listener closed, waiting for open connections"
        );

        if tokio::time::timeout(drain_timeout, connections.wait())
            .await
            .is_err()
        {
            warn!(
                open = connections.len(),
                "Drain timeout elapsed with connections still open"
            );
        }
    }
}
