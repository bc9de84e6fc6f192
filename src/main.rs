//! SparkKV server entry point.
//!
//! Parses flags, sets up logging, binds the listener and serves until Ctrl+C.

use clap::Parser;
use sparkkv::{Server, ServerConfig};
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// SparkKV - a small Redis-compatible key-value server
#[derive(Parser, Debug)]
#[command(name = "sparkkv", version = sparkkv::VERSION, about)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = sparkkv::DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = sparkkv::DEFAULT_PORT)]
    port: u16,

    /// Maximum number of expired keys removed per sweep
    #[arg(long, default_value_t = sparkkv::storage::DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,

    /// Milliseconds between two expiry sweeps
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    sweep_interval_ms: u64,

    /// Close a connection whose undecoded input grows past this many bytes
    #[arg(long)]
    max_buffer_bytes: Option<usize>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig::builder()
            .host(args.host)
            .port(args.port)
            .sample_size(args.sample_size)
            .sweep_interval(Duration::from_millis(args.sweep_interval_ms))
            .max_buffer_bytes(args.max_buffer_bytes)
            .build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from(args);
    info!(version = sparkkv::VERSION, "Starting SparkKV");

    let server = Server::bind(config).await?;

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    server.run_until(shutdown).await
}
