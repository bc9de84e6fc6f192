//! # SparkKV - A Small Redis-Compatible Key-Value Server
//!
//! SparkKV speaks the RESP wire protocol over TCP and keeps every key in
//! memory. It supports a handful of string commands, per-key expiry, and a
//! background task that reclaims expired keys nobody reads again.
//!
//! ## Features
//!
//! - **RESP Codec**: Stateless decoder that reports incomplete input instead of failing
//! - **Shared Store**: One `RwLock`-protected map shared by every connection
//! - **TTL Support**: Millisecond expiry, checked lazily on reads and swept actively
//! - **Async I/O**: Built on Tokio, one task per client connection
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             SparkKV                              │
//! │                                                                  │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐           │
//! │  │   Server    │───>│ Connection  │───>│  Command    │           │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │           │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘           │
//! │                            │                  │                  │
//! │                            ▼                  ▼                  │
//! │                     ┌─────────────┐    ┌─────────────────────┐   │
//! │                     │ parse_frame │    │    StorageEngine    │   │
//! │                     │ (protocol)  │    │  RwLock<HashMap<..>>│   │
//! │                     └─────────────┘    └──────────▲──────────┘   │
//! │                                                   │              │
//! │                                        ┌──────────┴──────────┐   │
//! │                                        │    ExpirySweeper    │   │
//! │                                        │ (Background Task)   │   │
//! │                                        └─────────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use sparkkv::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::builder().port(6380).build();
//!     let server = Server::bind(config).await?;
//!
//!     server
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING [message]`
//! - `ECHO message`
//! - `SET key value [EX seconds | PX milliseconds | EXAT unix-seconds | PXAT unix-milliseconds]`
//! - `GET key`
//! - `DEL key [key ...]`
//! - `EXISTS key [key ...]`
//! - `INCR key` / `DECR key`
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP value model, encoder and decoder
//! - [`storage`]: Key-value store with expiry and the background sweeper
//! - [`commands`]: Command dispatch
//! - [`connection`]: Per-client read/dispatch/write loop
//! - [`server`]: Listener and accept loop
//! - [`client`]: Line-oriented client used by `sparkkv-cli`
//! - [`config`]: Server configuration
//!
//! ## Lazy + Active Expiry
//!
//! Keys with a TTL are expired in two ways:
//! 1. **Lazy**: Reads treat an elapsed key as absent
//! 2. **Active**: A background task removes a bounded batch of elapsed keys every tick

pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use client::Client;
pub use commands::CommandHandler;
pub use config::ServerConfig;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{parse_frame, ParseError, RespValue};
pub use server::Server;
pub use storage::{ExpiryConfig, ExpirySweeper, StorageEngine};

/// The default port SparkKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host SparkKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of SparkKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
