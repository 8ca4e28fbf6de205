//! Commit correlation.
//!
//! Reconciles repository-state-change notifications with the version store.
//! Per watched repository the engine keeps the last observed HEAD and the
//! most recent staged-file snapshot. When HEAD moves, every staged file with
//! history gets a new version whose content is prefixed with a marker line
//! naming the commit. With auto-cleanup enabled the earlier versions of those
//! files are deleted.
//!
//! The staged set is captured on every notification before HEAD is
//! compared. When HEAD has moved and the index is already empty, the set
//! captured on the previous notification is narrowed to the paths the new
//! HEAD changed, provided it is a direct child of the observed commit.

mod engine;
mod state;

pub use engine::{commit_marker, CommitCorrelator, CommitSummary, RoundOutcome};
pub use state::RepositoryState;
