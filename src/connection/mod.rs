//! Per-client connection handling
//!
//! The server spawns one task per accepted socket and runs
//! [`handle_connection`] in it. Clients are independent of each other; the
//! only shared state is the storage engine behind the [`crate::CommandHandler`]
//! and the [`ConnectionStats`] counters.
//!
//! ```text
//!   socket bytes ──> read buffer ──> parse_frame ──> CommandHandler
//!        ▲                                               │
//!        └────────────── encoded reply <─────────────────┘
//! ```
//!
//! Frames are answered strictly in arrival order, so a client may pipeline
//! several requests in one write.

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
