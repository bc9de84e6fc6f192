//! RESP Protocol Implementation
//!
//! This module provides the wire codec for the Redis Serialization Protocol (RESP).
//!
//! ## Overview
//!
//! RESP is a simple, binary-safe protocol used by Redis for client-server communication.
//! Requests are arrays of bulk strings; replies may be any single value.
//!
//! ## Modules
//!
//! - `types`: Defines the `RespValue` enum and its encoding
//! - `parser`: Stateless decoder for incoming RESP data
//!
//! ## Example
//!
//! ```
//! use sparkkv::protocol::{parse_frame, RespValue};
//! use bytes::Bytes;
//!
//! // Decoding incoming data
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (value, consumed) = parse_frame(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//!
//! // Encoding responses
//! let response = RespValue::bulk_string(Bytes::from("blue"));
//! assert_eq!(response.serialize(), b"$4\r\nblue\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_frame, ParseError, ParseResult};
pub use types::RespValue;
