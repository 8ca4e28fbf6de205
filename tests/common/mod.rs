//! Shared test helpers.

#![allow(dead_code)]

use checkpoint_store::{ChangeCallback, Settings, Store, StoreConfig, Vcs, VcsError, VcsWatch};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub fn test_store(dir: &TempDir, settings: Settings) -> Store {
    Store::open_or_create(StoreConfig::for_workspace(dir.path()), settings).unwrap()
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Repository whose HEAD, index and message are scripted by the test.
pub struct ScriptedRepo {
    root: PathBuf,
    pub head: Mutex<Option<String>>,
    pub staged: Mutex<Vec<PathBuf>>,
    pub message: Mutex<Result<Option<String>, String>>,
    pub fail_staged: Mutex<bool>,
    /// Commit hash to (first parent, changed paths).
    pub commits: Mutex<HashMap<String, (String, Vec<PathBuf>)>>,
    /// Runs inside `latest_commit_message`, while a round is in flight.
    pub on_message_query: Mutex<Option<Hook>>,
    callback: Arc<Mutex<Option<ChangeCallback>>>,
}

impl ScriptedRepo {
    pub fn new(root: &Path) -> Arc<Self> {
        Arc::new(Self {
            root: root.to_path_buf(),
            head: Mutex::new(None),
            staged: Mutex::new(Vec::new()),
            message: Mutex::new(Ok(None)),
            fail_staged: Mutex::new(false),
            commits: Mutex::new(HashMap::new()),
            on_message_query: Mutex::new(None),
            callback: Arc::new(Mutex::new(None)),
        })
    }

    pub fn set_head(&self, head: &str) {
        *self.head.lock() = Some(head.to_string());
    }

    pub fn stage(&self, paths: &[&str]) {
        *self.staged.lock() = paths.iter().map(PathBuf::from).collect();
    }

    pub fn set_message(&self, message: &str) {
        *self.message.lock() = Ok(Some(message.to_string()));
    }

    /// Simulate `git commit`: the staged paths are committed on top of
    /// HEAD, HEAD moves, the index empties.
    pub fn commit(&self, head: &str, message: &str) {
        let paths = self.staged.lock().clone();
        self.commit_paths(head, message, &paths);
        self.staged.lock().clear();
    }

    /// Record a child of the current HEAD changing `paths` and move to it.
    /// The index is left as it is.
    pub fn commit_paths(&self, head: &str, message: &str, paths: &[PathBuf]) {
        let parent = self.head.lock().clone().unwrap_or_default();
        self.commits
            .lock()
            .insert(head.to_string(), (parent, paths.to_vec()));
        self.set_head(head);
        self.set_message(message);
    }

    /// Simulate `git reset --hard` or a checkout: HEAD moves to a commit
    /// that is not a child of the current one and the index empties.
    pub fn reset(&self, head: &str, message: &str) {
        self.set_head(head);
        self.set_message(message);
        self.staged.lock().clear();
    }

    pub fn is_subscribed(&self) -> bool {
        self.callback.lock().is_some()
    }

    /// Fire a repository-state-change notification.
    pub fn notify(&self) {
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl Vcs for ScriptedRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    fn head_commit_hash(&self) -> Result<Option<String>, VcsError> {
        Ok(self.head.lock().clone())
    }

    fn staged_file_paths(&self) -> Result<Vec<PathBuf>, VcsError> {
        if *self.fail_staged.lock() {
            return Err(VcsError::Query("index unreadable".to_string()));
        }
        Ok(self.staged.lock().clone())
    }

    fn latest_commit_message(&self) -> Result<Option<String>, VcsError> {
        if let Some(hook) = self.on_message_query.lock().as_ref() {
            hook();
        }
        self.message.lock().clone().map_err(VcsError::Query)
    }

    fn committed_paths(&self, commit: &str, parent: &str) -> Result<Option<Vec<PathBuf>>, VcsError> {
        let paths = self
            .commits
            .lock()
            .get(commit)
            .filter(|(first_parent, _)| first_parent == parent)
            .map(|(_, paths)| paths.clone());
        Ok(paths)
    }

    fn subscribe(&self, on_change: ChangeCallback) -> Result<VcsWatch, VcsError> {
        *self.callback.lock() = Some(on_change);
        let slot = Arc::clone(&self.callback);
        Ok(VcsWatch::new(move || {
            slot.lock().take();
        }))
    }
}
