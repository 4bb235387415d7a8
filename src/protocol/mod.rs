//! Protocol Module
//!
//! Newline-delimited text protocol: command parsing and dispatch.
//!
//! # Commands
//! - `SET <key> <value>` - Store a value, replies `OK`
//! - `GET <key>` - Replies `VALUE: <value>` or `NULL`
//! - `DEL <key>` - Replies `OK` or `ERROR: Key not found`
//!
//! Every reply is terminated with `\r\n`.

mod handler;
mod parser;

pub use handler::{CommandHandler, Response};
pub use parser::{parse_command, Command, ParsedCommand};

use crate::cache::{MAX_KEY_LENGTH, MAX_VALUE_SIZE};

/// Line terminator appended to every response
pub const RESPONSE_TERMINATOR: &str = "\r\n";

/// Longest accepted request line, including the newline
pub const MAX_LINE_LENGTH: usize = MAX_KEY_LENGTH + MAX_VALUE_SIZE + 64;
