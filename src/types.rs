//! Core types for the checkpoint store.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Surrogate key of a tracked file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub i64);

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Surrogate key of a version row.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionId(pub i64);

impl fmt::Debug for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionId({})", self.0)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a version within its file (starts at 1).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionNumber(pub i64);

impl VersionNumber {
    /// Number assigned to the first version of a file.
    pub const FIRST: VersionNumber = VersionNumber(1);

    pub fn next(self) -> Self {
        VersionNumber(self.0 + 1)
    }
}

impl fmt::Debug for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tracked workspace file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub id: FileId,

    /// Workspace-relative path with `/` separators. Unique.
    pub file_path: String,

    /// Newest non-deleted version, if any.
    pub current_version_id: Option<VersionId>,
}

/// One immutable content snapshot of a file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,

    /// Owning file.
    pub file_id: FileId,

    /// Full text snapshot.
    pub content: String,

    /// Creation time (UTC).
    pub timestamp: NaiveDateTime,

    pub version_number: VersionNumber,

    /// Free-text annotation. The only mutable field.
    pub label: Option<String>,
}

impl Version {
    /// Number of `'\n'`-separated lines in the content.
    pub fn line_count(&self) -> usize {
        self.content.split('\n').count()
    }
}

/// Last commit recorded for a repository.
///
/// Persisted in `repository_commits`; nothing in the core reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMark {
    pub repo_path: String,
    pub commit_hash: String,
    pub timestamp: NaiveDateTime,
}

/// Store statistics.
#[derive(Clone, Debug, Default)]
pub struct StoreStats {
    pub file_count: u64,
    pub version_count: u64,
    pub watched_repositories: u64,
}
