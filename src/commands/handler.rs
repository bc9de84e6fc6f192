//! Command Handler Module
//!
//! This module implements the Redis-compatible commands served by SparkKV.
//! It takes decoded RESP arrays, validates their arity and dispatches them to
//! the storage engine.
//!
//! ## Supported Commands
//!
//! - `PING [message]` - Test connection
//! - `ECHO message` - Echo message
//! - `SET key value [EX seconds | PX milliseconds | EXAT unix-seconds | PXAT unix-milliseconds]`
//! - `GET key` - Get a key's value
//! - `DEL key [key ...]` - Delete keys
//! - `EXISTS key [key ...]` - Count existing keys
//! - `INCR key` / `DECR key` - Add or subtract one
//!
//! Every failure is turned into a RESP error reply; nothing here closes the
//! connection.

use crate::protocol::RespValue;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;

const ERR_NOT_INTEGER: &str = "ERR value is not an integer or out of range";
const ERR_SYNTAX: &str = "ERR syntax error";

/// How a SET modifier turns its argument into an expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    /// `EX seconds` / `PX milliseconds`, relative to now
    RelativeMs(u64),
    /// `EXAT unix-seconds` / `PXAT unix-milliseconds`
    AbsoluteMs(u64),
}

/// Handles Redis commands by dispatching them to the appropriate handlers.
#[derive(Clone)]
pub struct CommandHandler {
    /// The storage engine
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Executes a command and returns the response.
    ///
    /// # Arguments
    ///
    /// * `command` - The decoded RESP value (should be an array of bulk strings)
    ///
    /// # Returns
    ///
    /// The RESP response to send back to the client.
    pub fn execute(&self, command: RespValue) -> RespValue {
        let args = match command.into_array() {
            Some(args) if !args.is_empty() => args,
            _ => return RespValue::error("ERR invalid command format"),
        };

        let cmd_name = match args[0].to_arg_bytes() {
            Some(name) => String::from_utf8_lossy(&name).to_lowercase(),
            None => return RespValue::error("ERR invalid command name"),
        };

        let args = match args[1..]
            .iter()
            .map(RespValue::to_arg_bytes)
            .collect::<Option<Vec<Bytes>>>()
        {
            Some(args) => args,
            None => return RespValue::error("ERR invalid argument type"),
        };

        self.dispatch(&cmd_name, &args)
    }

    /// Dispatches a command to its handler.
    fn dispatch(&self, cmd: &str, args: &[Bytes]) -> RespValue {
        match cmd {
            "ping" => self.cmd_ping(args),
            "echo" => self.cmd_echo(args),
            "set" => self.cmd_set(args),
            "get" => self.cmd_get(args),
            "del" => self.cmd_del(args),
            "exists" => self.cmd_exists(args),
            "incr" => self.cmd_incr(args),
            "decr" => self.cmd_decr(args),
            _ => unknown_command(cmd, args),
        }
    }

    /// PING [message]
    fn cmd_ping(&self, args: &[Bytes]) -> RespValue {
        match args {
            [] => RespValue::pong(),
            [message] => RespValue::bulk_string(message.clone()),
            _ => wrong_arity("ping"),
        }
    }

    /// ECHO message
    fn cmd_echo(&self, args: &[Bytes]) -> RespValue {
        match args {
            [message] => RespValue::bulk_string(message.clone()),
            _ => wrong_arity("echo"),
        }
    }

    /// SET key value [EX seconds | PX milliseconds | EXAT unix-seconds | PXAT unix-milliseconds]
    fn cmd_set(&self, args: &[Bytes]) -> RespValue {
        match args {
            [key, value] => {
                self.storage.set(key.clone(), value.clone());
                RespValue::ok()
            }
            [key, value, modifier, amount] => {
                let expiry = match parse_expiry(modifier, amount) {
                    Ok(expiry) => expiry,
                    Err(reply) => return reply,
                };
                match expiry {
                    Expiry::RelativeMs(ms) => {
                        self.storage
                            .set_with_relative_expiry(key.clone(), value.clone(), ms)
                    }
                    Expiry::AbsoluteMs(at) => {
                        self.storage
                            .set_with_absolute_expiry(key.clone(), value.clone(), at)
                    }
                }
                RespValue::ok()
            }
            _ => wrong_arity("set"),
        }
    }

    /// GET key
    fn cmd_get(&self, args: &[Bytes]) -> RespValue {
        match args {
            [key] => match self.storage.get(key) {
                Some(value) => RespValue::bulk_string(value),
                None => RespValue::null_bulk(),
            },
            _ => wrong_arity("get"),
        }
    }

    /// DEL key [key ...]
    fn cmd_del(&self, args: &[Bytes]) -> RespValue {
        if args.is_empty() {
            return wrong_arity("del");
        }

        let deleted = self.storage.delete_many(args);
        RespValue::integer(deleted as i64)
    }

    /// EXISTS key [key ...]
    fn cmd_exists(&self, args: &[Bytes]) -> RespValue {
        if args.is_empty() {
            return wrong_arity("exists");
        }

        let count = self.storage.exists_many(args);
        RespValue::integer(count as i64)
    }

    /// INCR key
    fn cmd_incr(&self, args: &[Bytes]) -> RespValue {
        match args {
            [key] => match self.storage.incr(key) {
                Ok(n) => RespValue::integer(n),
                Err(e) => RespValue::error(format!("ERR {}", e)),
            },
            _ => wrong_arity("incr"),
        }
    }

    /// DECR key
    fn cmd_decr(&self, args: &[Bytes]) -> RespValue {
        match args {
            [key] => match self.storage.decr(key) {
                Ok(n) => RespValue::integer(n),
                Err(e) => RespValue::error(format!("ERR {}", e)),
            },
            _ => wrong_arity("decr"),
        }
    }
}

/// Parses a SET expiry modifier and its amount.
///
/// The amount is validated before the modifier name, so `SET k v FOO x`
/// reports the integer error rather than a syntax error.
fn parse_expiry(modifier: &[u8], amount: &[u8]) -> Result<Expiry, RespValue> {
    let amount = std::str::from_utf8(amount)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| RespValue::error(ERR_NOT_INTEGER))? as u64;

    let seconds_to_ms =
        |secs: u64| secs.checked_mul(1000).ok_or_else(|| RespValue::error(ERR_NOT_INTEGER));

    match modifier.to_ascii_uppercase().as_slice() {
        b"EX" => Ok(Expiry::RelativeMs(seconds_to_ms(amount)?)),
        b"PX" => Ok(Expiry::RelativeMs(amount)),
        b"EXAT" => Ok(Expiry::AbsoluteMs(seconds_to_ms(amount)?)),
        b"PXAT" => Ok(Expiry::AbsoluteMs(amount)),
        _ => Err(RespValue::error(ERR_SYNTAX)),
    }
}

fn wrong_arity(cmd: &str) -> RespValue {
    RespValue::error(format!(
        "ERR wrong number of arguments for '{}' command",
        cmd
    ))
}

fn unknown_command(cmd: &str, args: &[Bytes]) -> RespValue {
    let args = args
        .iter()
        .map(|arg| format!("'{}'", String::from_utf8_lossy(arg)))
        .collect::<Vec<_>>()
        .join(" ");
    RespValue::error(format!(
        "ERR unknown command '{}', with args beginning with: {}",
        cmd, args
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::now_ms;
    use std::time::Duration;

    fn create_handler() -> CommandHandler {
        let storage = Arc::new(StorageEngine::new());
        CommandHandler::new(storage)
    }

    fn make_command(args: &[&str]) -> RespValue {
        RespValue::array(
            args.iter()
                .map(|s| RespValue::bulk_string(Bytes::from(s.to_string())))
                .collect(),
        )
    }

    #[test]
    fn test_ping() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["PING"]));
        assert_eq!(response, RespValue::simple_string("PONG"));

        let response = handler.execute(make_command(&["ping", "hello"]));
        assert_eq!(response, RespValue::bulk_string(Bytes::from("hello")));

        let response = handler.execute(make_command(&["PING", "a", "b"]));
        assert_eq!(
            response,
            RespValue::error("ERR wrong number of arguments for 'ping' command")
        );
    }

    #[test]
    fn test_echo() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["ECHO", "hi there"]));
        assert_eq!(response, RespValue::bulk_string(Bytes::from("hi there")));

        let response = handler.execute(make_command(&["ECHO"]));
        assert_eq!(
            response,
            RespValue::error("ERR wrong number of arguments for 'echo' command")
        );
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["SET", "key", "value"]));
        assert_eq!(response, RespValue::ok());

        let response = handler.execute(make_command(&["GET", "key"]));
        assert_eq!(response, RespValue::bulk_string(Bytes::from("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["GET", "nonexistent"]));
        assert_eq!(response, RespValue::null_bulk());
    }

    #[test]
    fn test_set_with_relative_expiry() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["SET", "key", "value", "EX", "1"]));
        assert_eq!(response, RespValue::ok());
        let response = handler.execute(make_command(&["GET", "key"]));
        assert_eq!(response, RespValue::bulk_string(Bytes::from("value")));

        let response = handler.execute(make_command(&["SET", "short", "value", "px", "50"]));
        assert_eq!(response, RespValue::ok());
        std::thread::sleep(Duration::from_millis(100));
        let response = handler.execute(make_command(&["GET", "short"]));
        assert_eq!(response, RespValue::null_bulk());
    }

    #[test]
    fn test_set_ex_one_second() {
        let handler = create_handler();

        handler.execute(make_command(&["SET", "k", "v", "EX", "1"]));
        let response = handler.execute(make_command(&["GET", "k"]));
        assert_eq!(response, RespValue::bulk_string(Bytes::from("v")));

        std::thread::sleep(Duration::from_millis(1100));
        let response = handler.execute(make_command(&["GET", "k"]));
        assert_eq!(response, RespValue::null_bulk());
    }

    #[test]
    fn test_set_with_absolute_expiry() {
        let storage = Arc::new(StorageEngine::new());
        let handler = CommandHandler::new(Arc::clone(&storage));

        let at_secs = now_ms() / 1000 + 3600;
        let response = handler.execute(make_command(&[
            "SET",
            "key",
            "value",
            "EXAT",
            &at_secs.to_string(),
        ]));
        assert_eq!(response, RespValue::ok());
        assert_eq!(
            storage.get_entry(b"key").unwrap().expires_at,
            Some(at_secs * 1000)
        );

        let response = handler.execute(make_command(&["SET", "past", "value", "PXAT", "1000"]));
        assert_eq!(response, RespValue::ok());
        let response = handler.execute(make_command(&["GET", "past"]));
        assert_eq!(response, RespValue::null_bulk());
    }

    #[test]
    fn test_set_errors() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["SET", "key", "value", "KEEPTTL", "10"]));
        assert_eq!(response, RespValue::error("ERR syntax error"));

        for bad in ["0", "-5", "ten"] {
            let response = handler.execute(make_command(&["SET", "key", "value", "EX", bad]));
            assert_eq!(
                response,
                RespValue::error("ERR value is not an integer or out of range")
            );
        }

        let response = handler.execute(make_command(&[
            "SET",
            "key",
            "value",
            "EX",
            "9223372036854775807",
        ]));
        assert_eq!(
            response,
            RespValue::error("ERR value is not an integer or out of range")
        );

        for args in [&["SET", "key"][..], &["SET", "key", "value", "EX"][..]] {
            let response = handler.execute(make_command(args));
            assert_eq!(
                response,
                RespValue::error("ERR wrong number of arguments for 'set' command")
            );
        }

        // Failed SETs leave nothing behind
        let response = handler.execute(make_command(&["EXISTS", "key"]));
        assert_eq!(response, RespValue::integer(0));
    }

    #[test]
    fn test_del() {
        let handler = create_handler();

        handler.execute(make_command(&["SET", "k1", "v1"]));
        handler.execute(make_command(&["SET", "k3", "v3"]));

        let response = handler.execute(make_command(&["DEL", "k1", "k2", "k3"]));
        assert_eq!(response, RespValue::integer(2));

        let response = handler.execute(make_command(&["DEL", "k1"]));
        assert_eq!(response, RespValue::integer(0));

        let response = handler.execute(make_command(&["DEL"]));
        assert_eq!(
            response,
            RespValue::error("ERR wrong number of arguments for 'del' command")
        );
    }

    #[test]
    fn test_exists() {
        let handler = create_handler();

        handler.execute(make_command(&["SET", "key1", "value1"]));
        handler.execute(make_command(&["SET", "gone", "value", "PXAT", "1"]));

        let response = handler.execute(make_command(&["EXISTS", "key1", "gone", "nope"]));
        assert_eq!(response, RespValue::integer(1));

        let response = handler.execute(make_command(&["EXISTS"]));
        assert_eq!(
            response,
            RespValue::error("ERR wrong number of arguments for 'exists' command")
        );
    }

    #[test]
    fn test_incr_decr() {
        let handler = create_handler();

        handler.execute(make_command(&["SET", "counter", "10"]));

        let response = handler.execute(make_command(&["INCR", "counter"]));
        assert_eq!(response, RespValue::integer(11));

        let response = handler.execute(make_command(&["DECR", "counter"]));
        assert_eq!(response, RespValue::integer(10));

        let response = handler.execute(make_command(&["GET", "counter"]));
        assert_eq!(response, RespValue::bulk_string(Bytes::from("10")));
    }

    #[test]
    fn test_incr_errors_do_not_create_keys() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["INCR", "missing"]));
        assert_eq!(
            response,
            RespValue::error("ERR value is not an integer or out of range")
        );
        let response = handler.execute(make_command(&["EXISTS", "missing"]));
        assert_eq!(response, RespValue::integer(0));

        handler.execute(make_command(&["SET", "name", "blue"]));
        let response = handler.execute(make_command(&["DECR", "name"]));
        assert_eq!(
            response,
            RespValue::error("ERR value is not an integer or out of range")
        );

        let response = handler.execute(make_command(&["INCR", "a", "b"]));
        assert_eq!(
            response,
            RespValue::error("ERR wrong number of arguments for 'incr' command")
        );
    }

    #[test]
    fn test_incr_preserves_ttl() {
        let storage = Arc::new(StorageEngine::new());
        let handler = CommandHandler::new(Arc::clone(&storage));

        handler.execute(make_command(&["SET", "counter", "1", "PX", "60000"]));
        let expires_at = storage.get_entry(b"counter").unwrap().expires_at;

        handler.execute(make_command(&["INCR", "counter"]));
        let entry = storage.get_entry(b"counter").unwrap();
        assert_eq!(entry.value, Bytes::from("2"));
        assert_eq!(entry.expires_at, expires_at);
    }

    #[test]
    fn test_unknown_command() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["FOOBAR", "a", "b"]));
        assert_eq!(
            response,
            RespValue::error("ERR unknown command 'foobar', with args beginning with: 'a' 'b'")
        );

        let response = handler.execute(make_command(&["NOPE"]));
        assert_eq!(
            response,
            RespValue::error("ERR unknown command 'nope', with args beginning with: ")
        );
    }

    #[test]
    fn test_invalid_requests() {
        let handler = create_handler();

        for request in [
            RespValue::array(vec![]),
            RespValue::null_array(),
            RespValue::simple_string("PING"),
        ] {
            assert_eq!(
                handler.execute(request),
                RespValue::error("ERR invalid command format")
            );
        }

        let response = handler.execute(RespValue::array(vec![RespValue::null_bulk()]));
        assert_eq!(response, RespValue::error("ERR invalid command name"));
    }

    #[test]
    fn test_integer_arguments_are_text() {
        let handler = create_handler();

        let response = handler.execute(RespValue::array(vec![
            RespValue::bulk_string(Bytes::from("SET")),
            RespValue::integer(7),
            RespValue::integer(41),
        ]));
        assert_eq!(response, RespValue::ok());

        let response = handler.execute(make_command(&["INCR", "7"]));
        assert_eq!(response, RespValue::integer(42));
    }
}
