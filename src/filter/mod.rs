//! Change-significance filter.
//!
//! Decides whether a saved document differs enough from the file's latest
//! version to be worth a new snapshot. The decision is pure: callers pass
//! the previous content and act on the returned [`Decision`].

pub mod diff;
mod significance;

pub use diff::{DiffLine, DiffStats, LineOp};
pub use significance::{evaluate, Decision, SkipReason, NOISE_THRESHOLD};
