//! Storage error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// A persisted file exists but cannot be decoded; never silently reset
    #[error("Corrupt state file {path:?}: {source}. Delete it to start over")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "Multiple active sessions found for {start_url}: {candidates:?}. \
         Set an explicit output directory to choose one"
    )]
    AmbiguousSession {
        start_url: String,
        candidates: Vec<PathBuf>,
    },

    #[error("No session to resume for {0}")]
    SessionNotFound(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
