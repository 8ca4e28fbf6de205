//! Error types for the checkpoint store.

use crate::types::{FileId, VersionId};
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File not found: {0}")]
    FileIdNotFound(FileId),

    #[error("Version not found: {0}")]
    VersionNotFound(VersionId),

    #[error("File already exists: {0}")]
    FileExists(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i32, supported: i32 },

    #[error("VCS query failed: {0}")]
    Vcs(#[from] VcsError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Path is outside the workspace: {0}")]
    OutsideWorkspace(String),

    #[error("Store is locked by another process")]
    Locked,

    #[error("Store not initialized")]
    NotInitialized,
}

impl StoreError {
    /// Whether this error is one of the not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::FileNotFound(_)
                | StoreError::FileIdNotFound(_)
                | StoreError::VersionNotFound(_)
        )
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Config(e.to_string())
    }
}

/// Errors raised by a VCS capability.
///
/// These never escape a correlation round; they abort it.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("no repository at {0}")]
    NoRepository(String),

    #[error("query failed: {0}")]
    Query(String),

    #[cfg(feature = "git")]
    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
