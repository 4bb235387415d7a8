//! Command Parser
//!
//! Splits a request line into a command name and arguments, then validates
//! argument counts into a typed [`Command`].
//!
//! Lines are tokenized as raw bytes so a value reaches the cache unchanged.
//! Only the command name and the key are decoded as UTF-8.

use crate::cache::Value;
use crate::error::ProtocolError;

/// A request line split on ASCII whitespace, name upper-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<Vec<u8>>,
}

/// A validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { key: String, value: Value },
    Get { key: String },
    Del { key: String },
}

/// Parses one request line.
///
/// Command names are matched case-insensitively; arguments keep their case.
pub fn parse_command(input: &[u8]) -> Result<ParsedCommand, ProtocolError> {
    let mut parts = input
        .split(u8::is_ascii_whitespace)
        .filter(|token| !token.is_empty());

    let name = parts.next().ok_or(ProtocolError::Empty)?;
    let name = decode(name, "command")?.to_ascii_uppercase();

    Ok(ParsedCommand {
        name,
        args: parts.map(<[u8]>::to_vec).collect(),
    })
}

fn decode(bytes: &[u8], field: &'static str) -> Result<String, ProtocolError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| ProtocolError::InvalidUtf8 { field })
}

impl ParsedCommand {
    /// Checks the command name and argument count.
    pub fn validate(self) -> Result<Command, ProtocolError> {
        let mut args = self.args.into_iter();

        match self.name.as_str() {
            "SET" => match (args.next(), args.next(), args.next()) {
                (Some(key), Some(value), None) => Ok(Command::Set {
                    key: decode(&key, "key")?,
                    value: Value::new(value),
                }),
                _ => Err(ProtocolError::Arity {
                    command: "SET",
                    expects: "key and value",
                }),
            },
            "GET" => match (args.next(), args.next()) {
                (Some(key), None) => Ok(Command::Get {
                    key: decode(&key, "key")?,
                }),
                _ => Err(ProtocolError::Arity {
                    command: "GET",
                    expects: "key",
                }),
            },
            "DEL" => match (args.next(), args.next()) {
                (Some(key), None) => Ok(Command::Del {
                    key: decode(&key, "key")?,
                }),
                _ => Err(ProtocolError::Arity {
                    command: "DEL",
                    expects: "key",
                }),
            },
            other => Err(ProtocolError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, ProtocolError> {
        parse_command(line.as_bytes()).and_then(ParsedCommand::validate)
    }

    #[test]
    fn test_parse_splits_and_uppercases() {
        let parsed = parse_command(b"  set Key  Value \r\n").unwrap();
        assert_eq!(parsed.name, "SET");
        assert_eq!(parsed.args, vec![b"Key".to_vec(), b"Value".to_vec()]);
    }

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(parse_command(b""), Err(ProtocolError::Empty));
        assert_eq!(parse_command(b"   \t \r\n"), Err(ProtocolError::Empty));
    }

    #[test]
    fn test_validate_commands() {
        assert_eq!(
            parse("SET a 1"),
            Ok(Command::Set {
                key: "a".into(),
                value: Value::from("1")
            })
        );
        assert_eq!(parse("get a"), Ok(Command::Get { key: "a".into() }));
        assert_eq!(parse("Del a"), Ok(Command::Del { key: "a".into() }));
    }

    #[test]
    fn test_value_bytes_are_kept() {
        let command = parse_command(b"SET k \xff\xfe\n")
            .and_then(ParsedCommand::validate)
            .unwrap();
        assert_eq!(
            command,
            Command::Set {
                key: "k".into(),
                value: Value::new(vec![0xff, 0xfe])
            }
        );
    }

    #[test]
    fn test_invalid_utf8_key_or_name() {
        let err = parse_command(b"GET \xff").and_then(ParsedCommand::validate);
        assert_eq!(err, Err(ProtocolError::InvalidUtf8 { field: "key" }));
        assert_eq!(
            err.unwrap_err().to_string(),
            "ERROR: key must be valid UTF-8"
        );

        assert_eq!(
            parse_command(b"S\xffT k v"),
            Err(ProtocolError::InvalidUtf8 { field: "command" })
        );
    }

    #[test]
    fn test_validate_arity_messages() {
        let err = parse("SET a").unwrap_err();
        assert_eq!(err.to_string(), "ERROR: SET requires key and value");

        let err = parse("SET a b c").unwrap_err();
        assert_eq!(err.to_string(), "ERROR: SET requires key and value");

        let err = parse("GET").unwrap_err();
        assert_eq!(err.to_string(), "ERROR: GET requires key");

        let err = parse("DEL a b").unwrap_err();
        assert_eq!(err.to_string(), "ERROR: DEL requires key");
    }

    #[test]
    fn test_validate_unknown_command() {
        let err = parse("foo bar").unwrap_err();
        assert_eq!(err.to_string(), "ERROR: Unknown command 'FOO'");
    }
}
