//! Write Log Module
//!
//! Append-only log with one `SET <key> <value>` line per successful write.
//! The log is diagnostic: it is never replayed on startup.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::cache::Value;
use crate::error::{CacheError, Result};

/// Logged operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Set,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOp::Set => f.write_str("SET"),
        }
    }
}

// == Write Log Record ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteLogRecord {
    pub operation: WriteOp,
    pub key: String,
    pub value: Value,
    pub timestamp: DateTime<Utc>,
}

impl WriteLogRecord {
    pub fn set(key: String, value: Value) -> Self {
        Self {
            operation: WriteOp::Set,
            key,
            value,
            timestamp: Utc::now(),
        }
    }

    /// Encodes the record as one log line, value bytes written as-is.
    pub fn encode(&self) -> Vec<u8> {
        let mut line = Vec::with_capacity(self.key.len() + self.value.len() + 6);
        line.extend_from_slice(self.operation.to_string().as_bytes());
        line.push(b' ');
        line.extend_from_slice(self.key.as_bytes());
        line.push(b' ');
        line.extend_from_slice(self.value.as_bytes());
        line.push(b'\n');
        line
    }
}

// == Write Log ==
/// Append-only log file, opened lazily and reopened after a failure.
#[derive(Debug)]
pub struct WriteLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl WriteLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: Mutex::new(None),
        }
    }

    // == Append ==
    /// Appends one record. Appends are serialised by an internal lock.
    pub async fn append(&self, record: &WriteLogRecord) -> Result<()> {
        let mut guard = self.file.lock().await;

        let file = match guard.take() {
            Some(file) => file,
            None => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|source| self.io_error(source))?,
        };
        let file = guard.insert(file);

        if let Err(source) = write_line(file, &record.encode()).await {
            // Drop the handle so the next append reopens the file
            *guard = None;
            return Err(self.io_error(source));
        }

        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::WriteLogIo {
            path: self.path.clone(),
            source,
        }
    }
}

async fn write_line(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_record_encoding() {
        let record = WriteLogRecord::set("user:1".to_string(), Value::from("alice"));
        assert_eq!(record.encode(), b"SET user:1 alice\n".to_vec());
        assert_eq!(record.operation, WriteOp::Set);
    }

    #[tokio::test]
    async fn test_append_creates_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aof.log");
        let log = WriteLog::new(&path);

        log.append(&WriteLogRecord::set("a".into(), Value::from("1")))
            .await
            .unwrap();
        log.append(&WriteLogRecord::set("b".into(), Value::from("2")))
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "SET a 1\nSET b 2\n");
    }

    #[tokio::test]
    async fn test_append_keeps_existing_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aof.log");
        tokio::fs::write(&path, "SET old value\n").await.unwrap();

        let log = WriteLog::new(&path);
        log.append(&WriteLogRecord::set("new".into(), Value::from("v")))
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "SET old value\nSET new v\n");
    }

    #[tokio::test]
    async fn test_append_failure_is_reported() {
        let dir = tempdir().unwrap();
        let log = WriteLog::new(dir.path().join("missing").join("aof.log"));

        let result = log
            .append(&WriteLogRecord::set("k".into(), Value::from("v")))
            .await;
        assert!(matches!(result, Err(CacheError::WriteLogIo { .. })));
    }
}
