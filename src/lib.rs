//! # Checkpoint Store
//!
//! A local, per-workspace snapshot store for source files. It gives coding
//! assistants reliable checkpoints of file history.
//!
//! ## Core Concepts
//!
//! - **Files**: Workspace-relative paths, created lazily on first saved snapshot
//! - **Versions**: Immutable, sequentially numbered content snapshots of a file
//! - **Significance filter**: Suppresses duplicate and trivially small edits
//! - **Commit correlation**: Annotates (and optionally collapses) the history of
//!   files that were part of a VCS commit
//!
//! ## Example
//!
//! ```ignore
//! use checkpoint_store::{Settings, Store, StoreConfig};
//!
//! let store = Store::open_or_create(
//!     StoreConfig {
//!         path: "./.checkpoints".into(),
//!         ..Default::default()
//!     },
//!     Settings::default(),
//! )?;
//!
//! // Editor save event
//! let outcome = store.record_save("src/main.rs", "fn main() {\n}\n")?;
//!
//! // Watch a git repository for commits
//! let repo = checkpoint_store::vcs::GitRepository::open(".")?;
//! store.correlator().watch(std::sync::Arc::new(repo))?;
//! ```

pub mod config;
pub mod correlation;
pub mod error;
pub mod filter;
pub mod paths;
pub mod store;
pub mod subscriptions;
pub mod types;
pub mod vcs;
pub mod versions;

// Re-exports
pub use config::{Settings, SettingsProvider, SharedSettings, StoreConfig};
pub use correlation::{
    commit_marker, CommitCorrelator, CommitSummary, RepositoryState, RoundOutcome,
};
pub use error::{Result, StoreError, VcsError};
pub use filter::{evaluate, Decision, SkipReason, NOISE_THRESHOLD};
pub use store::{SaveOutcome, Store};
pub use subscriptions::{
    RefreshCause, RefreshEvent, RefreshFilter, RefreshHandle, RefreshNotifier, SubscriptionId,
};
pub use types::*;
pub use vcs::{ChangeCallback, Vcs, VcsWatch};
pub use versions::{OpenReport, VersionStore};
