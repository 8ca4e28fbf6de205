//! Main Store struct tying all components together.

use crate::config::{SettingsProvider, StoreConfig};
use crate::correlation::CommitCorrelator;
use crate::error::{Result, StoreError};
use crate::filter::{self, Decision, SkipReason};
use crate::paths;
use crate::subscriptions::{RefreshCause, RefreshEvent, RefreshFilter, RefreshHandle, RefreshNotifier};
use crate::types::{FileId, StoreStats, TrackedFile, Version, VersionId};
use crate::versions::{OpenReport, VersionStore};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of handling an editor save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Version),
    Skipped(SkipReason),
}

impl SaveOutcome {
    pub fn version(&self) -> Option<&Version> {
        match self {
            SaveOutcome::Saved(version) => Some(version),
            SaveOutcome::Skipped(_) => None,
        }
    }
}

/// The checkpoint store of one workspace.
///
/// Provides a unified interface for:
/// - Recording editor saves through the significance filter
/// - Browsing and pruning version history
/// - Correlating VCS commits with history
/// - Subscribing to refresh signals
pub struct Store {
    /// Store configuration.
    config: StoreConfig,

    /// Lock file for exclusive access.
    _lock_file: File,

    versions: Arc<VersionStore>,

    settings: Arc<dyn SettingsProvider>,

    notifier: Arc<RefreshNotifier>,

    correlator: Arc<CommitCorrelator>,
}

impl Store {
    /// Open an existing store or create a new one.
    pub fn open_or_create(
        config: StoreConfig,
        settings: impl SettingsProvider + 'static,
    ) -> Result<Self> {
        if config.database_path().exists() {
            Self::open(config, settings)
        } else if config.create_if_missing {
            fs::create_dir_all(&config.path)?;
            Self::open(config, settings)
        } else {
            Err(StoreError::NotInitialized)
        }
    }

    /// Open a store whose directory already exists.
    pub fn open(config: StoreConfig, settings: impl SettingsProvider + 'static) -> Result<Self> {
        if !config.path.is_dir() {
            return Err(StoreError::NotInitialized);
        }

        let lock_file = Self::acquire_lock(&config.path)?;
        let versions = Arc::new(VersionStore::open(config.database_path())?);
        let settings: Arc<dyn SettingsProvider> = Arc::new(settings);
        let notifier = Arc::new(RefreshNotifier::new());
        let correlator = Arc::new(CommitCorrelator::new(
            Arc::clone(&versions),
            Arc::clone(&settings),
            Arc::clone(&notifier),
            config.workspace_root.clone(),
        ));

        info!(path = %config.path.display(), "opened checkpoint store");

        Ok(Self {
            config,
            _lock_file: lock_file,
            versions,
            settings,
            notifier,
            correlator,
        })
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_path = path.join("LOCK");
        let lock_file = File::create(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        Ok(lock_file)
    }

    fn normalize(&self, path: &str) -> Result<String> {
        paths::normalize_str(&self.config.workspace_root, path)
            .ok_or_else(|| StoreError::OutsideWorkspace(path.to_string()))
    }

    // --- Save path ---

    /// Handle an editor save of `path` with the full document text.
    ///
    /// The file is only created once a save passes the filter.
    pub fn record_save(&self, path: &str, content: &str) -> Result<SaveOutcome> {
        let path = self.normalize(path)?;
        let settings = self.settings.settings();

        let file = self.versions.get_file(&path)?;
        let latest = match &file {
            Some(file) => self.versions.latest_version(file.id)?,
            None => None,
        };

        let decision = filter::evaluate(
            latest.as_ref().map(|v| v.content.as_str()),
            content,
            settings.save_all_changes,
        );
        if let Decision::Skip(reason) = decision {
            debug!(path = %path, ?reason, "save skipped");
            return Ok(SaveOutcome::Skipped(reason));
        }

        let file = match file {
            Some(file) => file,
            None => self.versions.create_file(&path)?,
        };
        let version = self.versions.create_version(file.id, content, None)?;
        debug!(path = %path, version = %version.version_number, "save recorded");

        self.notifier
            .notify(RefreshEvent::path(path, RefreshCause::VersionCreated));
        Ok(SaveOutcome::Saved(version))
    }

    // --- History ---

    pub fn file(&self, path: &str) -> Result<Option<TrackedFile>> {
        let path = self.normalize(path)?;
        self.versions.get_file(&path)
    }

    pub fn files(&self) -> Result<Vec<TrackedFile>> {
        self.versions.get_all_files()
    }

    /// Versions of a file, newest first.
    pub fn history(&self, path: &str, limit: Option<usize>) -> Result<Vec<Version>> {
        let path = self.normalize(path)?;
        let file = self
            .versions
            .get_file(&path)?
            .ok_or(StoreError::FileNotFound(path))?;
        self.versions.get_file_versions(file.id, limit)
    }

    pub fn version(&self, id: VersionId) -> Result<Option<Version>> {
        self.versions.get_version(id)
    }

    /// Annotate a version.
    pub fn set_label(&self, id: VersionId, label: Option<&str>) -> Result<()> {
        let version = self
            .versions
            .get_version(id)?
            .ok_or(StoreError::VersionNotFound(id))?;
        self.versions.set_label(id, label)?;
        self.notify_file(version.file_id, RefreshCause::LabelChanged)
    }

    /// Delete one version (user-initiated).
    pub fn delete_version(&self, id: VersionId) -> Result<()> {
        let version = self
            .versions
            .get_version(id)?
            .ok_or(StoreError::VersionNotFound(id))?;
        self.versions.delete_version(id)?;
        self.notify_file(version.file_id, RefreshCause::VersionDeleted)
    }

    /// Keep only the current version of a file. Returns the number deleted.
    pub fn quick_clean(&self, path: &str) -> Result<usize> {
        let path = self.normalize(path)?;
        let file = self
            .versions
            .get_file(&path)?
            .ok_or_else(|| StoreError::FileNotFound(path.clone()))?;
        let Some(current) = file.current_version_id else {
            return Ok(0);
        };

        let deleted = self.versions.retain_only(file.id, current)?;
        if deleted > 0 {
            self.notifier
                .notify(RefreshEvent::path(path, RefreshCause::HistoryCleaned));
        }
        Ok(deleted)
    }

    /// Delete every version of every file. Files stay tracked.
    pub fn clear_all(&self) -> Result<usize> {
        let mut deleted = 0;
        for file in self.versions.get_all_files()? {
            deleted += self.versions.delete_all_versions(file.id)?;
        }
        info!(deleted, "cleared all history");
        self.notifier
            .notify(RefreshEvent::all(RefreshCause::HistoryCleared));
        Ok(deleted)
    }

    fn notify_file(&self, file_id: FileId, cause: RefreshCause) -> Result<()> {
        let event = match self.versions.get_file_by_id(file_id)? {
            Some(file) => RefreshEvent::path(file.file_path, cause),
            None => RefreshEvent::all(cause),
        };
        self.notifier.notify(event);
        Ok(())
    }

    // --- Components ---

    /// Subscribe to refresh signals.
    pub fn subscribe(&self, filter: RefreshFilter) -> RefreshHandle {
        self.notifier.subscribe(filter)
    }

    /// Commit correlation engine bound to this store.
    pub fn correlator(&self) -> &Arc<CommitCorrelator> {
        &self.correlator
    }

    /// Direct access to the version store.
    pub fn versions(&self) -> &Arc<VersionStore> {
        &self.versions
    }

    /// Outcome of opening the database (quarantine details).
    pub fn open_report(&self) -> &OpenReport {
        self.versions.open_report()
    }

    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            file_count: self.versions.file_count()? as u64,
            version_count: self.versions.total_version_count()? as u64,
            watched_repositories: self.correlator.watched_repositories().len() as u64,
        })
    }

    /// Get the store path.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Get the workspace root.
    pub fn workspace_root(&self) -> &Path {
        &self.config.workspace_root
    }
}
