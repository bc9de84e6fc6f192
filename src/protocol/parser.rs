//! Stateless RESP Frame Decoder
//!
//! This module turns the front of a byte buffer into one [`RespValue`].
//!
//! ## How the Decoder Works
//!
//! [`parse_frame`] looks at the buffer and returns either:
//! - `Ok(Some((value, consumed)))` - A complete frame was found, `consumed` bytes were used
//! - `Ok(None)` - The frame is not complete yet, nothing was consumed
//! - `Err(ParseError)` - The bytes can never become a valid frame
//!
//! The decoder keeps no state between calls. The caller appends newly read
//! bytes to its buffer, calls [`parse_frame`] again from the first byte, and
//! advances the buffer by `consumed` on success. Arrays are decoded by
//! recursion over a cumulative cursor; if any element is incomplete the whole
//! array reports `Ok(None)` and is re-scanned from the start on the next call.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use std::num::ParseIntError;
use thiserror::Error;

/// Errors for byte sequences that are not, and cannot become, a valid frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// Invalid integer format (integer frames and length headers)
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a simple string, error message or header
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, nesting too deep, etc.)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The declared bulk length exceeds the maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

/// Bytes consumed by a null bulk string. Always the literal `$-1\r\n`,
/// whatever spelling of -1 the header used.
pub const NULL_BULK_FRAME_LEN: usize = 5;

/// Upper bound on the capacity reserved up front for an array, so that a
/// huge declared count cannot force a huge allocation before any element
/// has arrived.
const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

/// Attempts to decode one frame from the start of `buf`.
///
/// # Example
///
/// ```
/// use sparkkv::protocol::{parse_frame, RespValue};
///
/// let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
/// let (value, consumed) = parse_frame(data).unwrap().unwrap();
/// assert_eq!(consumed, data.len());
/// assert!(matches!(value, RespValue::Array(Some(ref items)) if items.len() == 2));
///
/// // A truncated frame is simply not ready yet
/// assert!(parse_frame(&data[..10]).unwrap().is_none());
/// ```
pub fn parse_frame(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    parse_value(buf, 0)
}

/// Internal recursive decoding function.
fn parse_value(buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
    if buf.is_empty() {
        return Ok(None);
    }

    if depth > MAX_NESTING_DEPTH {
        return Err(ParseError::ProtocolError(format!(
            "maximum nesting depth exceeded: {}",
            MAX_NESTING_DEPTH
        )));
    }

    match buf[0] {
        prefix::SIMPLE_STRING => parse_line(buf).map(|line| {
            line.map(|(s, consumed)| (RespValue::SimpleString(s.to_string()), consumed))
        }),
        prefix::ERROR => parse_line(buf)
            .map(|line| line.map(|(s, consumed)| (RespValue::Error(s.to_string()), consumed))),
        prefix::INTEGER => parse_integer(buf),
        prefix::BULK_STRING => parse_bulk_string(buf),
        prefix::ARRAY => parse_array(buf, depth),
        other => Err(ParseError::UnknownPrefix(other)),
    }
}

/// Reads the text between the prefix byte and the first CRLF.
///
/// Returns the text and the bytes consumed including the CRLF.
fn parse_line(buf: &[u8]) -> ParseResult<Option<(&str, usize)>> {
    match find_crlf(&buf[1..]) {
        Some(pos) => {
            let s = std::str::from_utf8(&buf[1..1 + pos])
                .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
            // +1 for prefix, +2 for CRLF
            Ok(Some((s, 1 + pos + 2)))
        }
        None => Ok(None),
    }
}

/// Reads a header line as a signed 64-bit integer.
fn parse_header_number(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    match parse_line(buf)? {
        Some((s, consumed)) => {
            let n: i64 = s
                .parse()
                .map_err(|e: ParseIntError| ParseError::InvalidInteger(e.to_string()))?;
            Ok(Some((n, consumed)))
        }
        None => Ok(None),
    }
}

/// Parses an integer: `:<integer>\r\n`
fn parse_integer(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    debug_assert!(buf[0] == prefix::INTEGER);

    Ok(parse_header_number(buf)?.map(|(n, consumed)| (RespValue::Integer(n), consumed)))
}

/// Parses a bulk string: `$<length>\r\n<data>\r\n`
fn parse_bulk_string(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    debug_assert!(buf[0] == prefix::BULK_STRING);

    let (length, data_start) = match parse_header_number(buf)? {
        Some(header) => header,
        None => return Ok(None),
    };

    if length == -1 {
        return Ok(Some((RespValue::BulkString(None), NULL_BULK_FRAME_LEN)));
    }

    if length < 0 {
        return Err(ParseError::InvalidBulkLength(length));
    }

    let length = length as usize;

    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    // The payload may itself contain CRLF, so only the declared length counts
    let total_needed = data_start + length + 2;
    if buf.len() < total_needed {
        return Ok(None);
    }

    if &buf[data_start + length..total_needed] != CRLF {
        return Err(ParseError::ProtocolError(
            "bulk string missing trailing CRLF".to_string(),
        ));
    }

    let data = Bytes::copy_from_slice(&buf[data_start..data_start + length]);

    Ok(Some((RespValue::BulkString(Some(data)), total_needed)))
}

/// Parses an array: `*<count>\r\n<elements...>`
fn parse_array(buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
    debug_assert!(buf[0] == prefix::ARRAY);

    let (count, mut consumed) = match parse_header_number(buf)? {
        Some(header) => header,
        None => return Ok(None),
    };

    if count == -1 {
        return Ok(Some((RespValue::Array(None), consumed)));
    }

    if count < 0 {
        return Err(ParseError::InvalidArrayLength(count));
    }

    let count = count as usize;
    let mut elements = Vec::with_capacity(count.min(MAX_PREALLOCATED_ELEMENTS));

    for _ in 0..count {
        if consumed >= buf.len() {
            return Ok(None);
        }

        match parse_value(&buf[consumed..], depth + 1)? {
            Some((value, element_consumed)) => {
                elements.push(value);
                consumed += element_consumed;
            }
            None => return Ok(None),
        }
    }

    Ok(Some((RespValue::Array(Some(elements)), consumed)))
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}
