//! TCP Server
//!
//! Binds the listener, owns the shared storage engine and the expiry sweeper,
//! and spawns one task per accepted connection.

use crate::commands::CommandHandler;
use crate::config::ServerConfig;
use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::{ExpirySweeper, StorageEngine};
use anyhow::Context;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// A bound SparkKV server, ready to accept connections.
pub struct Server {
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
    config: ServerConfig,
}

impl Server {
    /// Binds the listening socket described by `config`.
    ///
    /// Fails if the address cannot be bound (already in use, bad host, ...).
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("failed to bind {}", address))?;

        let storage = Arc::new(StorageEngine::with_sample_size(config.sample_size));
        info!(address = %address, "Listening");

        Ok(Self {
            listener,
            storage,
            stats: Arc::new(ConnectionStats::new()),
            config,
        })
    }

    /// The address the listener actually bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn storage(&self) -> Arc<StorageEngine> {
        Arc::clone(&self.storage)
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Serves clients until `shutdown` completes.
    ///
    /// The expiry sweeper runs for as long as this future does.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let _sweeper = ExpirySweeper::start(Arc::clone(&self.storage), self.config.expiry_config());

        tokio::select! {
            _ = accept_loop(
                self.listener,
                self.storage,
                self.stats,
                self.config.max_buffer_bytes,
            ) => {}
            _ = shutdown => {
                info!("Shutdown signal received, stopping server...");
            }
        }

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
    max_buffer_bytes: Option<usize>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(client = %addr, error = %e, "Failed to set TCP_NODELAY");
                }

                let handler = CommandHandler::new(Arc::clone(&storage));
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats, max_buffer_bytes).await;
                });
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}
