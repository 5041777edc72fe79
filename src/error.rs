//! Error types for lockstore.
//!
//! One enum covers the whole persistence core. Release, backup and temp-file
//! cleanup failures never surface here; they are logged where they happen.

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for lockstore operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The cross-process lock was not obtained within the retry budget.
    #[error("lock on '{}' not acquired after {attempts} attempt(s){}", path.display(), holder_suffix(holder))]
    LockTimeout {
        path: PathBuf,
        attempts: u32,
        holder: Option<String>,
    },

    /// The lock was taken over by another process before the commit.
    #[error("lock on '{}' was lost before commit", path.display())]
    LockLost { path: PathBuf },

    /// The in-process queue for a path was not entered in time.
    #[error("timed out after {waited_ms}ms waiting for queued operations on '{}'", key.display())]
    MutexTimeout { key: PathBuf, waited_ms: u64 },

    /// Too many operations are already queued for a path.
    #[error("operation queue for '{}' is full ({depth} pending)", key.display())]
    QueueFull { key: PathBuf, depth: usize },

    /// The stored document is not valid JSON.
    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Content could not be encoded as JSON. Retrying cannot help.
    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The atomic write failed on every attempt.
    #[error("write to '{}' failed after {attempts} attempt(s): {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: Box<StoreError>,
    },

    /// Generic filesystem failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration values.
    #[error("config validation failed: {0}")]
    Config(String),
}

fn holder_suffix(holder: &Option<String>) -> String {
    match holder {
        Some(h) => format!(" (held by {})", h),
        None => String::new(),
    }
}

impl StoreError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            StoreError::LockTimeout { .. } => exit_codes::LOCK_FAILURE,
            StoreError::LockLost { .. } => exit_codes::LOCK_FAILURE,
            StoreError::MutexTimeout { .. } => exit_codes::LOCK_FAILURE,
            StoreError::QueueFull { .. } => exit_codes::LOCK_FAILURE,
            StoreError::Parse { .. } => exit_codes::DATA_ERROR,
            StoreError::Serialize(_) => exit_codes::DATA_ERROR,
            StoreError::WriteFailed { .. } => exit_codes::IO_FAILURE,
            StoreError::Io { .. } => exit_codes::IO_FAILURE,
            StoreError::Config(_) => exit_codes::USER_ERROR,
        }
    }

    /// Whether another write attempt could plausibly succeed.
    ///
    /// Encoding failures and bad configuration are deterministic. A lock
    /// timeout has already used up its own retry budget. Everything else
    /// (a lost lock, transient I/O) is worth another try.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            StoreError::Serialize(_) | StoreError::Config(_) | StoreError::LockTimeout { .. }
        )
    }
}

/// Result type alias for lockstore operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn parse_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("{not json").unwrap_err()
    }

    #[test]
    fn lock_timeout_has_lock_exit_code() {
        let err = StoreError::LockTimeout {
            path: PathBuf::from("state.json"),
            attempts: 3,
            holder: None,
        };
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
    }

    #[test]
    fn parse_error_has_data_exit_code() {
        let err = StoreError::Parse {
            path: PathBuf::from("state.json"),
            source: parse_error(),
        };
        assert_eq!(err.exit_code(), exit_codes::DATA_ERROR);
    }

    #[test]
    fn write_failed_carries_last_error() {
        let err = StoreError::WriteFailed {
            path: PathBuf::from("state.json"),
            attempts: 3,
            source: Box::new(StoreError::io(
                "failed to rename",
                std::io::Error::other("disk full"),
            )),
        };
        assert_eq!(err.exit_code(), exit_codes::IO_FAILURE);
        let source = err.source().unwrap().to_string();
        assert!(source.contains("disk full"));
        assert!(err.to_string().contains("after 3 attempt(s)"));
    }

    #[test]
    fn lock_timeout_message_names_holder() {
        let err = StoreError::LockTimeout {
            path: PathBuf::from("state.json"),
            attempts: 5,
            holder: Some("agent@box (pid 42)".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("5 attempt(s)"));
        assert!(msg.contains("held by agent@box (pid 42)"));
    }

    #[test]
    fn serialize_config_and_lock_timeout_errors_are_not_retryable() {
        let err = StoreError::Serialize(parse_error());
        assert!(!err.is_retryable());
        assert!(!StoreError::Config("bad".to_string()).is_retryable());
        let timeout = StoreError::LockTimeout {
            path: PathBuf::from("state.json"),
            attempts: 11,
            holder: None,
        };
        assert!(!timeout.is_retryable());
        let lost = StoreError::LockLost {
            path: PathBuf::from("state.json"),
        };
        assert!(lost.is_retryable());
        assert!(StoreError::io("x", std::io::Error::other("y")).is_retryable());
    }
}
