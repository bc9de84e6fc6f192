//! RESP wire values
//!
//! The closed set of values a client and server exchange, and the one byte
//! encoding each of them has.
//!
//! ```text
//! +OK\r\n                          simple string
//! -ERR unknown command\r\n         error
//! :1000\r\n                        integer
//! $5\r\nhello\r\n                  bulk string
//! $-1\r\n                          null bulk string
//! *2\r\n$3\r\nGET\r\n$4\r\nname\r\n  array of two bulk strings
//! *-1\r\n                          null array
//! ```
//!
//! Null and empty are different values: `$-1\r\n` is not `$0\r\n\r\n`, and
//! `*-1\r\n` is not `*0\r\n`.

use bytes::Bytes;
use std::fmt;

/// Line terminator for every header and payload.
pub const CRLF: &[u8] = b"\r\n";

/// First byte of each encoded value.
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// One RESP value.
///
/// Bulk strings and arrays carry an `Option` so the protocol null can be
/// told apart from an empty payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Single line of text without CR or LF.
    SimpleString(String),

    /// Single line of text reporting a failure.
    Error(String),

    Integer(i64),

    /// Length-prefixed, binary-safe payload; `None` is the null bulk string.
    BulkString(Option<Bytes>),

    /// Ordered values, possibly nested; `None` is the null array.
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    /// ```
    /// use sparkkv::protocol::types::RespValue;
    /// assert_eq!(RespValue::simple_string("OK").serialize(), b"+OK\r\n");
    /// ```
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// ```
    /// use sparkkv::protocol::types::RespValue;
    /// assert_eq!(RespValue::error("ERR syntax error").serialize(), b"-ERR syntax error\r\n");
    /// ```
    pub fn error(message: impl Into<String>) -> Self {
        RespValue::Error(message.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// A present bulk string.
    ///
    /// ```
    /// use sparkkv::protocol::types::RespValue;
    /// use bytes::Bytes;
    /// let value = RespValue::bulk_string(Bytes::from_static(b"hi"));
    /// assert_eq!(value.serialize(), b"$2\r\nhi\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(Some(data.into()))
    }

    pub fn null_bulk() -> Self {
        RespValue::BulkString(None)
    }

    /// A present array.
    pub fn array(items: Vec<RespValue>) -> Self {
        RespValue::Array(Some(items))
    }

    pub fn null_array() -> Self {
        RespValue::Array(None)
    }

    /// `+OK`
    pub fn ok() -> Self {
        Self::simple_string("OK")
    }

    /// `+PONG`
    pub fn pong() -> Self {
        Self::simple_string("PONG")
    }

    /// Encodes the value into a fresh buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        self.serialize_into(&mut out);
        out
    }

    /// Appends the encoding of the value to `out`.
    pub fn serialize_into(&self, out: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(text) => put_line(out, prefix::SIMPLE_STRING, text.as_bytes()),
            RespValue::Error(text) => put_line(out, prefix::ERROR, text.as_bytes()),
            RespValue::Integer(n) => put_line(out, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(None) => put_line(out, prefix::BULK_STRING, b"-1"),
            RespValue::BulkString(Some(payload)) => {
                put_line(out, prefix::BULK_STRING, payload.len().to_string().as_bytes());
                out.extend_from_slice(payload);
                out.extend_from_slice(CRLF);
            }
            RespValue::Array(None) => put_line(out, prefix::ARRAY, b"-1"),
            RespValue::Array(Some(items)) => {
                put_line(out, prefix::ARRAY, items.len().to_string().as_bytes());
                items.iter().for_each(|item| item.serialize_into(out));
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::BulkString(None) | RespValue::Array(None))
    }

    /// Reads the value as a command argument.
    ///
    /// Bulk strings, simple strings and integers all count as text here.
    pub fn to_arg_bytes(&self) -> Option<Bytes> {
        match self {
            RespValue::BulkString(Some(payload)) => Some(payload.clone()),
            RespValue::SimpleString(text) => Some(Bytes::from(text.clone())),
            RespValue::Integer(n) => Some(Bytes::from(n.to_string())),
            _ => None,
        }
    }

    /// Items of a present array; `None` for anything else, the null array included.
    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(Some(items)) => Some(items),
            _ => None,
        }
    }
}

fn put_line(out: &mut Vec<u8>, tag: u8, body: &[u8]) {
    out.push(tag);
    out.extend_from_slice(body);
    out.extend_from_slice(CRLF);
}

/// Human-readable rendering used by the command-line client.
impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(text) => f.write_str(text),
            RespValue::Error(text) => write!(f, "(error) {}", text),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(Some(payload)) => match std::str::from_utf8(payload) {
                Ok(text) => write!(f, "{:?}", text),
                Err(_) => write!(f, "(binary, {} bytes)", payload.len()),
            },
            RespValue::BulkString(None) | RespValue::Array(None) => f.write_str("(nil)"),
            RespValue::Array(Some(items)) if items.is_empty() => f.write_str("(empty array)"),
            RespValue::Array(Some(items)) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{}) {}", index + 1, item)?;
                }
                Ok(())
            }
        }
    }
}
