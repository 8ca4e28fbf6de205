//! Store and behavior configuration.

use crate::error::{Result, StoreError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Workspace whose files are tracked. Stored paths are relative to it.
    pub workspace_root: PathBuf,

    /// Directory holding the database and lock file.
    pub path: PathBuf,

    /// Database file name inside `path`.
    pub database_name: String,

    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,
}

impl StoreConfig {
    /// Configuration storing its data in `<workspace_root>/.checkpoints`.
    pub fn for_workspace(workspace_root: impl Into<PathBuf>) -> Self {
        let workspace_root = workspace_root.into();
        Self {
            path: workspace_root.join(".checkpoints"),
            workspace_root,
            ..Default::default()
        }
    }

    /// Full path of the database file.
    pub fn database_path(&self) -> PathBuf {
        self.path.join(&self.database_name)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            path: PathBuf::from("./.checkpoints"),
            database_name: "checkpoints.db".to_string(),
            create_if_missing: true,
        }
    }
}

/// User-facing switches consulted by the save path and the commit engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Persist every non-duplicate save, bypassing the noise heuristics.
    pub save_all_changes: bool,

    /// After a commit, collapse each committed file's history to the
    /// annotated version.
    pub auto_cleanup_after_commit: bool,

    /// Presentation only.
    pub show_timestamps: bool,

    /// Presentation only.
    pub show_labels: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_all_changes: false,
            auto_cleanup_after_commit: false,
            show_timestamps: true,
            show_labels: true,
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }
}

/// Source of the current settings.
///
/// Read at every decision point, so changes apply to the next save or
/// correlation round.
pub trait SettingsProvider: Send + Sync {
    fn settings(&self) -> Settings;
}

impl SettingsProvider for Settings {
    fn settings(&self) -> Settings {
        self.clone()
    }
}

/// Settings that can be changed at runtime and shared between components.
#[derive(Clone, Debug, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<Settings>>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Replace the settings.
    pub fn set(&self, settings: Settings) {
        *self.inner.write() = settings;
    }

    /// Modify the settings in place.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.inner.write());
    }
}

impl SettingsProvider for SharedSettings {
    fn settings(&self) -> Settings {
        self.inner.read().clone()
    }
}
