//! Line-Oriented Client
//!
//! A small client used by the `sparkkv-cli` REPL. It turns a typed line into
//! a command array, sends it, and reads back exactly one reply frame.

use crate::protocol::{parse_frame, ParseError, RespValue};
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::trace;

/// Errors that can occur while talking to a server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server sent bytes that are not a valid frame
    #[error("Protocol error: {0}")]
    Protocol(#[from] ParseError),

    /// The server closed the connection before replying
    #[error("Connection closed by server")]
    Closed,
}

/// Builds a command array from a typed line.
///
/// The line is split on whitespace and every token becomes a bulk string.
/// Returns `None` for a blank line.
///
/// # Example
///
/// ```
/// use sparkkv::client::command_from_line;
/// use sparkkv::protocol::RespValue;
///
/// let command = command_from_line("SET name blue").unwrap();
/// assert_eq!(command.serialize(), b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$4\r\nblue\r\n");
/// assert!(command_from_line("   ").is_none());
/// ```
pub fn command_from_line(line: &str) -> Option<RespValue> {
    let items: Vec<RespValue> = line
        .split_whitespace()
        .map(|token| RespValue::bulk_string(Bytes::from(token.to_string())))
        .collect();

    if items.is_empty() {
        None
    } else {
        Some(RespValue::array(items))
    }
}

/// Returns true for the lines that end the REPL without sending anything.
pub fn is_exit_command(line: &str) -> bool {
    matches!(line.trim(), "exit" | "quit")
}

/// A connection to a SparkKV (or any RESP) server.
#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
    buffer: BytesMut,
}

impl Client {
    /// Connects to the server at `addr`.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
        })
    }

    /// Sends one command and waits for its reply.
    pub async fn send(&mut self, command: &RespValue) -> Result<RespValue, ClientError> {
        self.stream.write_all(&command.serialize()).await?;
        self.read_reply().await
    }

    /// Reads exactly one reply frame, keeping any extra bytes for later.
    async fn read_reply(&mut self) -> Result<RespValue, ClientError> {
        loop {
            if let Some((value, consumed)) = parse_frame(&self.buffer)? {
                self.buffer.advance(consumed);
                return Ok(value);
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(ClientError::Closed);
            }
            trace!(bytes = n, "Read reply data");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_command_from_line() {
        let command = command_from_line("  get   my-key ").unwrap();
        assert_eq!(
            command,
            RespValue::array(vec![
                RespValue::bulk_string(Bytes::from("get")),
                RespValue::bulk_string(Bytes::from("my-key")),
            ])
        );

        assert!(command_from_line("").is_none());
        assert!(command_from_line(" \t ").is_none());
    }

    #[test]
    fn test_exit_commands() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("quit "));
        assert!(!is_exit_command("QUITTER"));
        assert!(!is_exit_command("get exit"));
    }

    #[tokio::test]
    async fn test_reply_split_across_packets() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = stream.read(&mut buf).await.unwrap();
            stream.write_all(b"$5\r\nhel").await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            stream.write_all(b"lo\r\n").await.unwrap();
        });

        let mut client = Client::connect(addr).await.unwrap();
        let reply = client
            .send(&command_from_line("ECHO hello").unwrap())
            .await
            .unwrap();
        assert_eq!(reply, RespValue::bulk_string(Bytes::from("hello")));
    }

    #[tokio::test]
    async fn test_server_closing_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let mut client = Client::connect(addr).await.unwrap();
        let result = client.send(&command_from_line("PING").unwrap()).await;
        assert!(matches!(
            result,
            Err(ClientError::Closed) | Err(ClientError::Io(_))
        ));
    }
}
