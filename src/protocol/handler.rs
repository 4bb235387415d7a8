//! Command Dispatcher
//!
//! Turns request lines into engine calls and formats the responses.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{Cache, Value};
use crate::error::ProtocolError;
use crate::protocol::{parse_command, Command, ParsedCommand, RESPONSE_TERMINATOR};

// == Response ==
/// A reply to one request line, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    Value(Value),
    Null,
    /// Engine-level failure, rendered as `ERROR: <reason>`
    Error(String),
    /// Parse or validation failure, rendered verbatim
    Rejected(ProtocolError),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => f.write_str("OK"),
            Response::Value(value) => write!(f, "VALUE: {}", value),
            Response::Null => f.write_str("NULL"),
            Response::Error(reason) => write!(f, "ERROR: {}", reason),
            Response::Rejected(err) => write!(f, "{}", err),
        }
    }
}

impl Response {
    /// Wire form including the terminator. Value bytes are written unchanged.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = match self {
            Response::Value(value) => {
                let mut out = Vec::with_capacity(value.len() + 9);
                out.extend_from_slice(b"VALUE: ");
                out.extend_from_slice(value.as_bytes());
                out
            }
            other => other.to_string().into_bytes(),
        };
        out.extend_from_slice(RESPONSE_TERMINATOR.as_bytes());
        out
    }
}

// == Command Handler ==
/// Dispatches commands against a shared cache engine.
///
/// Cheap to clone; each connection holds its own copy.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    cache: Arc<Cache>,
}

impl CommandHandler {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    /// Parses, validates and executes one raw request line.
    pub async fn handle_line(&self, line: &[u8]) -> Response {
        let command = match parse_command(line).and_then(ParsedCommand::validate) {
            Ok(command) => command,
            Err(e) => {
                debug!(line = %String::from_utf8_lossy(line), error = %e, "Rejected command");
                return Response::Rejected(e);
            }
        };

        self.execute(command).await
    }

    /// Executes a validated command.
    pub async fn execute(&self, command: Command) -> Response {
        match command {
            Command::Set { key, value } => match self.cache.set(&key, value, None).await {
                Ok(outcome) => {
                    debug!(%key, ?outcome, "SET command");
                    Response::Ok
                }
                Err(e) => Response::Error(e.to_string()),
            },
            Command::Get { key } => match self.cache.get(&key).await {
                Some(value) => {
                    debug!(%key, "GET command: hit");
                    Response::Value(value)
                }
                None => {
                    debug!(%key, "GET command: not found");
                    Response::Null
                }
            },
            Command::Del { key } => {
                if self.cache.delete(&key).await {
                    debug!(%key, "DEL command: deleted");
                    Response::Ok
                } else {
                    debug!(%key, "DEL command: not found");
                    Response::Error("Key not found".to_string())
                }
            }
        }
    }
}
