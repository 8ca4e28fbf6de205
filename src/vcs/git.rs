//! Git implementation of [`Vcs`] on top of libgit2.

use super::{ChangeCallback, Vcs, VcsWatch};
use crate::error::VcsError;
use crossbeam_channel::{bounded, RecvTimeoutError};
use git2::{ErrorCode, Oid, Reference, Repository};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Default interval between repository polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A git working tree.
///
/// Notifications are produced by polling HEAD and the index file's
/// modification time.
pub struct GitRepository {
    root: PathBuf,
    repo: Mutex<Repository>,
    poll_interval: Duration,
}

impl GitRepository {
    /// Open the repository whose working tree is at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VcsError> {
        let path = path.as_ref();
        let repo = Repository::open(path)?;
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| VcsError::NoRepository(path.display().to_string()))?;

        Ok(Self {
            root,
            repo: Mutex::new(repo),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Change how often subscriptions poll the repository.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// HEAD reference, or `None` on an unborn branch.
fn head_ref(repo: &Repository) -> Result<Option<Reference<'_>>, VcsError> {
    match repo.head() {
        Ok(head) => Ok(Some(head)),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// What a poll compares between ticks.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Fingerprint {
    head: Option<Oid>,
    index_modified: Option<SystemTime>,
}

fn fingerprint(repo: &Repository) -> Fingerprint {
    Fingerprint {
        head: repo.refname_to_id("HEAD").ok(),
        index_modified: std::fs::metadata(repo.path().join("index"))
            .and_then(|m| m.modified())
            .ok(),
    }
}

impl Vcs for GitRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn head_commit_hash(&self) -> Result<Option<String>, VcsError> {
        let repo = self.repo.lock();
        let hash = match head_ref(&repo)? {
            Some(head) => Some(head.peel_to_commit()?.id().to_string()),
            None => None,
        };
        Ok(hash)
    }

    fn staged_file_paths(&self) -> Result<Vec<PathBuf>, VcsError> {
        let repo = self.repo.lock();
        let head_tree = match head_ref(&repo)? {
            Some(head) => Some(head.peel_to_tree()?),
            None => None,
        };

        let mut index = repo.index()?;
        index.read(true)?;
        let diff = repo.diff_tree_to_index(head_tree.as_ref(), Some(&index), None)?;

        let paths = diff
            .deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(Path::to_path_buf)
            })
            .collect();
        Ok(paths)
    }

    fn latest_commit_message(&self) -> Result<Option<String>, VcsError> {
        let repo = self.repo.lock();
        let Some(head) = head_ref(&repo)? else {
            return Ok(None);
        };
        let commit = head.peel_to_commit()?;
        let message = commit
            .message()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        Ok(message)
    }

    fn committed_paths(&self, commit: &str, parent: &str) -> Result<Option<Vec<PathBuf>>, VcsError> {
        let repo = self.repo.lock();
        let commit = repo.find_commit(Oid::from_str(commit)?)?;
        if commit.parent_count() == 0 || commit.parent_id(0)? != Oid::from_str(parent)? {
            return Ok(None);
        }

        let parent_tree = commit.parent(0)?.tree()?;
        let tree = commit.tree()?;
        let diff = repo.diff_tree_to_tree(Some(&parent_tree), Some(&tree), None)?;
        let paths = diff
            .deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(Path::to_path_buf)
            })
            .collect();
        Ok(Some(paths))
    }

    fn subscribe(&self, on_change: ChangeCallback) -> Result<VcsWatch, VcsError> {
        let root = self.root.clone();
        let interval = self.poll_interval;
        let mut last = fingerprint(&self.repo.lock());
        let (stop_tx, stop_rx) = bounded::<()>(1);

        thread::Builder::new()
            .name("checkpoint-git-poll".to_string())
            .spawn(move || {
                let repo = match Repository::open(&root) {
                    Ok(repo) => repo,
                    Err(e) => {
                        warn!(repo = %root.display(), error = %e, "git poller could not open repository");
                        return;
                    }
                };
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        _ => break,
                    }
                    let current = fingerprint(&repo);
                    if current != last {
                        last = current;
                        on_change();
                    }
                }
                debug!(repo = %root.display(), "git poller stopped");
            })
            .map_err(|e| VcsError::Query(format!("cannot start poller: {}", e)))?;

        Ok(VcsWatch::new(move || {
            let _ = stop_tx.try_send(());
        }))
    }
}
