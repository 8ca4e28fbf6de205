//! The correlation engine.

use super::state::RepositoryState;
use crate::config::SettingsProvider;
use crate::error::{Result, StoreError};
use crate::paths;
use crate::subscriptions::{RefreshCause, RefreshEvent, RefreshNotifier};
use crate::vcs::{Vcs, VcsWatch};
use crate::versions::VersionStore;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// Prefix of the marker line written at the top of annotated versions.
pub const COMMIT_MARKER_PREFIX: &str = "// Commit: ";

/// Marker line embedding a commit message (first non-empty line only).
pub fn commit_marker(message: &str) -> String {
    format!("{}{}", COMMIT_MARKER_PREFIX, summary_line(message))
}

fn summary_line(message: &str) -> &str {
    message
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

fn short_hash(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}

/// Result of an annotation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub commit: String,
    pub message: String,
    /// Files that received an annotated version.
    pub annotated: Vec<String>,
    /// Versions removed by auto-cleanup.
    pub versions_deleted: usize,
    /// Files whose annotation failed.
    pub failures: usize,
}

/// How a notification was handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The repository is not watched by this engine.
    NotWatched,
    /// Another round for the repository is in flight.
    Busy,
    /// The repository has no commits yet.
    NoCommit,
    /// HEAD did not move. The staged snapshot was refreshed.
    Unchanged,
    /// HEAD moved but the commit message could not be read.
    MessageUnavailable,
    /// HEAD or the staged files could not be read.
    QueryFailed,
    /// HEAD moved and the staged files were annotated.
    Processed(CommitSummary),
}

/// One watched repository.
struct RepositoryWatch {
    repo: Arc<dyn Vcs>,
    /// Held for a whole round; `try_lock` failing means a round is in flight.
    state: Mutex<RepositoryState>,
    subscription: Mutex<Option<VcsWatch>>,
}

/// Drives the version store from repository notifications.
pub struct CommitCorrelator {
    store: Arc<VersionStore>,
    settings: Arc<dyn SettingsProvider>,
    notifier: Arc<RefreshNotifier>,
    workspace_root: PathBuf,
    watches: RwLock<HashMap<PathBuf, Arc<RepositoryWatch>>>,
}

impl CommitCorrelator {
    pub fn new(
        store: Arc<VersionStore>,
        settings: Arc<dyn SettingsProvider>,
        notifier: Arc<RefreshNotifier>,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            settings,
            notifier,
            workspace_root: workspace_root.into(),
            watches: RwLock::new(HashMap::new()),
        }
    }

    /// Start watching a repository.
    ///
    /// The current HEAD becomes the last observed commit, so only commits
    /// made after registration are annotated. Watching an already watched
    /// root is a no-op.
    pub fn watch(self: &Arc<Self>, repo: Arc<dyn Vcs>) -> Result<()> {
        let root = repo.root().to_path_buf();

        let initial_head = repo.head_commit_hash().unwrap_or_else(|e| {
            warn!(repo = %root.display(), error = %e, "could not read HEAD at watch time");
            None
        });
        let watch = Arc::new(RepositoryWatch {
            repo: Arc::clone(&repo),
            state: Mutex::new(RepositoryState::at_commit(initial_head)),
            subscription: Mutex::new(None),
        });

        {
            let mut watches = self.watches.write();
            if watches.contains_key(&root) {
                debug!(repo = %root.display(), "repository already watched");
                return Ok(());
            }
            watches.insert(root.clone(), Arc::clone(&watch));
        }

        let engine: Weak<Self> = Arc::downgrade(self);
        let key = root.clone();
        let subscription = repo.subscribe(Arc::new(move || {
            if let Some(engine) = engine.upgrade() {
                engine.handle_state_change(&key);
            }
        }));

        match subscription {
            Ok(subscription) => {
                *watch.subscription.lock() = Some(subscription);
                info!(repo = %root.display(), "watching repository");
                Ok(())
            }
            Err(e) => {
                self.watches.write().remove(&root);
                Err(StoreError::Vcs(e))
            }
        }
    }

    /// Stop watching a repository and drop its state.
    pub fn unwatch(&self, root: &Path) -> bool {
        let removed = self.watches.write().remove(root);
        match removed {
            Some(watch) => {
                if let Some(subscription) = watch.subscription.lock().take() {
                    subscription.dispose();
                }
                info!(repo = %root.display(), "stopped watching repository");
                true
            }
            None => false,
        }
    }

    /// Roots of all watched repositories.
    pub fn watched_repositories(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self.watches.read().keys().cloned().collect();
        roots.sort();
        roots
    }

    /// Copy of a repository's state. Blocks while a round is in flight.
    pub fn repository_state(&self, root: &Path) -> Option<RepositoryState> {
        let watch = self.watches.read().get(root).cloned()?;
        let state = watch.state.lock().clone();
        Some(state)
    }

    /// Whether a round for the repository is in flight.
    pub fn is_processing(&self, root: &Path) -> bool {
        self.watches
            .read()
            .get(root)
            .is_some_and(|watch| watch.state.is_locked())
    }

    /// Handle one repository-state-change notification.
    ///
    /// Never fails: query and store errors are logged and end the round.
    pub fn handle_state_change(&self, root: &Path) -> RoundOutcome {
        let Some(watch) = self.watches.read().get(root).cloned() else {
            debug!(repo = %root.display(), "notification for unwatched repository");
            return RoundOutcome::NotWatched;
        };

        let Some(mut state) = watch.state.try_lock() else {
            debug!(repo = %root.display(), "round in flight, ignoring notification");
            return RoundOutcome::Busy;
        };

        let repo = watch.repo.as_ref();
        let head = match repo.head_commit_hash() {
            Ok(Some(head)) => head,
            Ok(None) => return RoundOutcome::NoCommit,
            Err(e) => {
                warn!(repo = %root.display(), error = %e, "could not read HEAD");
                return RoundOutcome::QueryFailed;
            }
        };

        let snapshot: BTreeSet<String> = match repo.staged_file_paths() {
            Ok(staged) => staged
                .iter()
                .filter_map(|p| {
                    let absolute = if p.has_root() { p.clone() } else { repo.root().join(p) };
                    paths::normalize(&self.workspace_root, &absolute)
                })
                .collect(),
            Err(e) => {
                warn!(repo = %root.display(), error = %e, "could not read staged files");
                return RoundOutcome::QueryFailed;
            }
        };
        let retained = std::mem::replace(&mut state.pending_staged_files, snapshot);

        if !state.is_new_commit(&head) {
            debug!(
                repo = %root.display(),
                staged = state.pending_staged_files.len(),
                "HEAD unchanged"
            );
            return RoundOutcome::Unchanged;
        }
        let previous = state.last_observed_commit.replace(head.clone());

        // A commit that already landed usually leaves the index empty. The
        // set captured on the previous notification is only trusted for the
        // paths a direct child of the observed commit changed.
        if state.pending_staged_files.is_empty() && !retained.is_empty() {
            if let Some(previous) = previous {
                state.pending_staged_files = self.committed_subset(repo, &head, &previous, retained);
            }
        }

        let message = match repo.latest_commit_message() {
            Ok(Some(message)) if !message.trim().is_empty() => message,
            Ok(_) => {
                warn!(repo = %root.display(), commit = %head, "commit has no message");
                return RoundOutcome::MessageUnavailable;
            }
            Err(e) => {
                warn!(repo = %root.display(), commit = %head, error = %e, "could not read commit message");
                return RoundOutcome::MessageUnavailable;
            }
        };

        let auto_cleanup = self.settings.settings().auto_cleanup_after_commit;
        let mut summary = CommitSummary {
            commit: head,
            message,
            ..Default::default()
        };

        for path in &state.pending_staged_files {
            match self.annotate(path, &summary.commit, &summary.message, auto_cleanup) {
                Ok(Some(deleted)) => {
                    summary.annotated.push(path.clone());
                    summary.versions_deleted += deleted;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(path = %path, commit = %summary.commit, error = %e, "failed to annotate file");
                    summary.failures += 1;
                }
            }
        }
        state.pending_staged_files.clear();

        if !summary.annotated.is_empty() {
            info!(
                repo = %root.display(),
                commit = %summary.commit,
                files = summary.annotated.len(),
                deleted = summary.versions_deleted,
                "annotated committed files"
            );
            self.notifier
                .notify(RefreshEvent::all(RefreshCause::CommitAnnotated));
        }

        RoundOutcome::Processed(summary)
    }

    /// Members of `retained` that `commit` changed relative to `parent`.
    /// Empty when the repository cannot show `commit` is a child of `parent`.
    fn committed_subset(
        &self,
        repo: &dyn Vcs,
        commit: &str,
        parent: &str,
        retained: BTreeSet<String>,
    ) -> BTreeSet<String> {
        match repo.committed_paths(commit, parent) {
            Ok(Some(changed)) => {
                let changed: BTreeSet<String> = changed
                    .iter()
                    .filter_map(|p| {
                        let absolute = if p.has_root() { p.clone() } else { repo.root().join(p) };
                        paths::normalize(&self.workspace_root, &absolute)
                    })
                    .collect();
                retained.into_iter().filter(|p| changed.contains(p)).collect()
            }
            Ok(None) => {
                debug!(commit, parent, "HEAD is not a child of the observed commit");
                BTreeSet::new()
            }
            Err(e) => {
                warn!(commit, error = %e, "could not read committed paths");
                BTreeSet::new()
            }
        }
    }

    /// Annotate one file. Returns `None` if the file has no history,
    /// otherwise the number of versions auto-cleanup removed.
    fn annotate(
        &self,
        path: &str,
        commit: &str,
        message: &str,
        auto_cleanup: bool,
    ) -> Result<Option<usize>> {
        let Some(file) = self.store.get_file(path)? else {
            return Ok(None);
        };
        let prior = if auto_cleanup {
            self.store.version_ids(file.id)?
        } else {
            Vec::new()
        };
        let Some(latest) = self.store.latest_version(file.id)? else {
            return Ok(None);
        };

        let content = format!("{}\n{}", commit_marker(message), latest.content);
        let label = format!("Commit {}: {}", short_hash(commit), summary_line(message));
        let annotated = self.store.create_version(file.id, &content, Some(&label))?;
        debug!(path, version = %annotated.version_number, "annotated version created");

        let mut deleted = 0;
        for id in prior {
            if self.store.delete_version_if_exists(id)? {
                deleted += 1;
            }
        }
        Ok(Some(deleted))
    }
}

impl Drop for CommitCorrelator {
    fn drop(&mut self) {
        for (_, watch) in self.watches.get_mut().drain() {
            if let Some(subscription) = watch.subscription.lock().take() {
                subscription.dispose();
            }
        }
    }
}
