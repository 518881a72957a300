//! Persistence error types.
//!
//! Cache operations return structured errors with a user-facing message
//! and an optional remediation hint.

use std::path::PathBuf;
use thiserror::Error;

/// Mapping cache error.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache could not be encoded as JSON.
    #[error("Failed to serialize mapping cache")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// Cache file exists but is not a valid cache document.
    #[error("Failed to parse mapping cache: {path}")]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PersistenceError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("Could not {} the file at {}", operation, path.display()),
            Self::Serialization { .. } => {
                "An error occurred while encoding the mapping cache.".to_string()
            }
            Self::Deserialization { path, .. } => format!(
                "The mapping cache at {} is corrupted and cannot be read.",
                path.display()
            ),
            Self::AtomicWriteFailed { target_path, .. } => format!(
                "Could not save the mapping cache to {}. Please check disk space and permissions.",
                target_path.display()
            ),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to this location.".into())
                }
            }
            Self::Serialization { .. } => None,
            Self::Deserialization { .. } => {
                Some("Delete the cache file; it will be rebuilt on the next run.".into())
            }
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or choose a different cache path.".into())
            }
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
