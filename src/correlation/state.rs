//! Per-repository correlation state.

use std::collections::BTreeSet;

/// What the engine remembers about one repository between notifications.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepositoryState {
    /// HEAD as of the last notification that saw a new commit.
    pub last_observed_commit: Option<String>,

    /// Workspace-relative paths that were staged on the latest notification.
    pub pending_staged_files: BTreeSet<String>,
}

impl RepositoryState {
    /// State for a repository whose HEAD is already known.
    pub fn at_commit(commit: Option<String>) -> Self {
        Self {
            last_observed_commit: commit,
            pending_staged_files: BTreeSet::new(),
        }
    }

    /// Whether `head` differs from the last observed commit.
    pub fn is_new_commit(&self, head: &str) -> bool {
        self.last_observed_commit.as_deref() != Some(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_commit_detection() {
        let state = RepositoryState::at_commit(Some("h1".to_string()));
        assert!(!state.is_new_commit("h1"));
        assert!(state.is_new_commit("h2"));
        assert!(RepositoryState::default().is_new_commit("h1"));
    }
}
