//! The read, dispatch, write loop for one client.
//!
//! TCP is a byte stream: one read may hold half a frame or several frames.
//! Bytes accumulate in a `BytesMut` until [`parse_frame`] reports a complete
//! frame, which is then executed and answered before the next one is decoded.
//! The buffer grows without bound unless a limit is configured.

use crate::commands::CommandHandler;
use crate::protocol::{parse_frame, ParseError, RespValue};
use bytes::{Buf, BytesMut};
use std::convert::Infallible;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

const READ_CHUNK: usize = 4096;

/// Counters shared by every connection of one server.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    pub connections_accepted: AtomicU64,
    pub active_connections: AtomicU64,
    pub commands_processed: AtomicU64,
    pub bytes_read: AtomicU64,
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    fn closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// Serves one client over any async byte stream.
///
/// Owns the read buffer. Replies go through a `BufWriter` that is flushed
/// after each reply.
pub struct ConnectionHandler<S> {
    io: BufWriter<S>,
    peer: SocketAddr,
    pending: BytesMut,
    buffer_limit: Option<usize>,
    dispatcher: CommandHandler,
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps `stream` and registers the connection in `stats`.
    ///
    /// `buffer_limit` caps the undecoded bytes held for this client; `None`
    /// lets the buffer grow as needed.
    pub fn new(
        stream: S,
        peer: SocketAddr,
        dispatcher: CommandHandler,
        stats: Arc<ConnectionStats>,
        buffer_limit: Option<usize>,
    ) -> Self {
        stats.opened();

        Self {
            io: BufWriter::new(stream),
            peer,
            pending: BytesMut::with_capacity(READ_CHUNK),
            buffer_limit,
            dispatcher,
            stats,
        }
    }

    /// Serves the client until it goes away or the stream fails.
    ///
    /// Returns why the connection ended; [`ConnectionError::Closed`] is the
    /// clean case.
    pub async fn run(mut self) -> ConnectionError {
        info!(client = %self.peer, "Client connected");

        let reason = match self.serve().await {
            Ok(never) => match never {},
            Err(reason) => reason,
        };
        match &reason {
            ConnectionError::Closed => debug!(client = %self.peer, "Client disconnected"),
            ConnectionError::Io(e) if e.kind() == ErrorKind::ConnectionReset => {
                debug!(client = %self.peer, "Connection reset by peer")
            }
            e => warn!(client = %self.peer, error = %e, "Connection failed"),
        }

        self.stats.closed();
        reason
    }

    /// Drains every complete frame, one reply at a time, then reads again.
    /// Only ever leaves through an error.
    async fn serve(&mut self) -> Result<Infallible, ConnectionError> {
        loop {
            while let Some(request) = self.next_frame().await? {
                let reply = self.dispatcher.execute(request);
                self.stats.commands_processed.fetch_add(1, Ordering::Relaxed);
                self.reply(&reply).await?;
            }

            self.fill().await?;
        }
    }

    /// Pops the next complete frame off the buffer.
    ///
    /// A malformed frame is answered with a protocol error before the
    /// failure is returned.
    async fn next_frame(&mut self) -> Result<Option<RespValue>, ConnectionError> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        match parse_frame(&self.pending) {
            Ok(Some((frame, used))) => {
                self.pending.advance(used);
                trace!(client = %self.peer, used, left = self.pending.len(), "Frame decoded");
                Ok(Some(frame))
            }
            Ok(None) => {
                trace!(client = %self.peer, held = self.pending.len(), "Waiting for rest of frame");
                Ok(None)
            }
            Err(e) => {
                warn!(client = %self.peer, error = %e, "Malformed frame");
                self.reply(&RespValue::error(format!("ERR Protocol error: {}", e)))
                    .await?;
                Err(ConnectionError::Protocol(e))
            }
        }
    }

    /// Appends whatever the socket has to the buffer.
    async fn fill(&mut self) -> Result<(), ConnectionError> {
        if let Some(limit) = self.buffer_limit {
            if self.pending.len() >= limit {
                warn!(client = %self.peer, held = self.pending.len(), limit, "Read buffer full");
                return Err(ConnectionError::BufferFull);
            }
        }

        self.pending.reserve(READ_CHUNK);
        let n = self.io.get_mut().read_buf(&mut self.pending).await?;

        if n == 0 {
            return Err(if self.pending.is_empty() {
                ConnectionError::Closed
            } else {
                ConnectionError::TruncatedFrame
            });
        }

        ConnectionStats::add(&self.stats.bytes_read, n);
        trace!(client = %self.peer, n, "Read from socket");
        Ok(())
    }

    async fn reply(&mut self, value: &RespValue) -> Result<(), ConnectionError> {
        let encoded = value.serialize();
        self.io.write_all(&encoded).await?;
        self.io.flush().await?;
        ConnectionStats::add(&self.stats.bytes_written, encoded.len());
        Ok(())
    }
}

/// Why a connection ended.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client sent bytes that are not a valid frame
    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),

    /// The client closed its side between frames
    #[error("connection closed")]
    Closed,

    /// The client closed its side in the middle of a frame
    #[error("connection closed mid-frame")]
    TruncatedFrame,

    /// Undecoded input reached the configured limit
    #[error("read buffer limit reached")]
    BufferFull,
}

/// Runs a [`ConnectionHandler`] to completion.
///
/// Whatever ends the connection is logged here and goes no further.
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    dispatcher: CommandHandler,
    stats: Arc<ConnectionStats>,
    buffer_limit: Option<usize>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, peer, dispatcher, stats, buffer_limit);
    let reason = handler.run().await;
    debug!(client = %peer, reason = %reason, "Connection task finished");
}
