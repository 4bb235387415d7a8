//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its persistence layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid request data (key or value out of bounds)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Eviction failed to make room for a new key
    #[error("Cache full: {0}")]
    CapacityExceeded(String),

    /// Snapshot temp-file write, fsync, rename or read failure
    #[error("Snapshot I/O error on {path}: {source}")]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot encoding error: {0}")]
    SnapshotEncoding(#[from] bincode::Error),

    /// Write log append failure
    #[error("Write log I/O error on {path}: {source}")]
    WriteLogIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Socket or other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// == Protocol Error Enum ==
/// Parse and validation failures for client command lines.
///
/// The `Display` output is the exact response text sent to the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Blank input line
    #[error("ERROR: Empty command")]
    Empty,

    /// Known command with the wrong number of arguments
    #[error("ERROR: {command} requires {expects}")]
    Arity {
        command: &'static str,
        expects: &'static str,
    },

    /// Command name not recognised
    #[error("ERROR: Unknown command '{0}'")]
    Unknown(String),

    /// Command name or key is not text
    #[error("ERROR: {field} must be valid UTF-8")]
    InvalidUtf8 { field: &'static str },
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_text_is_response() {
        assert_eq!(ProtocolError::Empty.to_string(), "ERROR: Empty command");
        assert_eq!(
            ProtocolError::Arity {
                command: "SET",
                expects: "key and value"
            }
            .to_string(),
            "ERROR: SET requires key and value"
        );
        assert_eq!(
            ProtocolError::Unknown("FOO".to_string()).to_string(),
            "ERROR: Unknown command 'FOO'"
        );
        assert_eq!(
            ProtocolError::InvalidUtf8 { field: "key" }.to_string(),
            "ERROR: key must be valid UTF-8"
        );
    }

    #[test]
    fn test_snapshot_io_error_names_path() {
        let err = CacheError::SnapshotIo {
            path: PathBuf::from("/tmp/snap.bin"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let text = err.to_string();
        assert!(text.contains("/tmp/snap.bin"));
        assert!(text.contains("denied"));
    }
}
