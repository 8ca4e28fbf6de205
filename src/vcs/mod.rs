//! Version-control capability consumed by the commit correlator.
//!
//! The correlator depends only on the [`Vcs`] trait. A git implementation
//! backed by libgit2 is available with the `git` feature.

#[cfg(feature = "git")]
mod git;

#[cfg(feature = "git")]
pub use git::GitRepository;

use crate::error::VcsError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Callback invoked on every repository-state-change notification.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// A watched repository.
pub trait Vcs: Send + Sync {
    /// Working-tree root. Relative staged paths are relative to it.
    fn root(&self) -> &Path;

    /// Hash of the commit HEAD points to, or `None` before the first commit.
    fn head_commit_hash(&self) -> Result<Option<String>, VcsError>;

    /// Paths currently staged for commit.
    fn staged_file_paths(&self) -> Result<Vec<PathBuf>, VcsError>;

    /// Message of the commit HEAD points to.
    fn latest_commit_message(&self) -> Result<Option<String>, VcsError>;

    /// Paths `commit` changed relative to `parent`, if `parent` is the
    /// commit's first parent. `None` when the relationship does not hold
    /// or cannot be determined.
    fn committed_paths(&self, commit: &str, parent: &str) -> Result<Option<Vec<PathBuf>>, VcsError> {
        let _ = (commit, parent);
        Ok(None)
    }

    /// Register for state-change notifications. Dropping the returned
    /// watch unsubscribes.
    fn subscribe(&self, on_change: ChangeCallback) -> Result<VcsWatch, VcsError>;
}

/// Disposable subscription handle.
pub struct VcsWatch {
    dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl VcsWatch {
    /// Watch that runs `dispose` when dropped.
    pub fn new(dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// Watch with nothing to tear down.
    pub fn noop() -> Self {
        Self { dispose: None }
    }

    /// Unsubscribe now.
    pub fn dispose(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for VcsWatch {
    fn drop(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl fmt::Debug for VcsWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VcsWatch")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}
