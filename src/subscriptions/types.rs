//! Refresh event and subscription types.

use serde::{Deserialize, Serialize};

/// What triggered a refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshCause {
    VersionCreated,
    VersionDeleted,
    LabelChanged,
    HistoryCleaned,
    HistoryCleared,
    CommitAnnotated,
}

/// Signal that views of the version history are stale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshEvent {
    /// Affected file, or `None` when any file may have changed.
    pub path: Option<String>,
    pub cause: RefreshCause,
}

impl RefreshEvent {
    /// Refresh scoped to one workspace-relative path.
    pub fn path(path: impl Into<String>, cause: RefreshCause) -> Self {
        Self {
            path: Some(path.into()),
            cause,
        }
    }

    /// Refresh everything.
    pub fn all(cause: RefreshCause) -> Self {
        Self { path: None, cause }
    }
}

/// Which events a subscriber receives.
#[derive(Clone, Debug)]
pub struct RefreshFilter {
    /// Max buffered events before the subscriber is disconnected.
    /// Default: 256
    pub buffer_size: usize,

    /// Only deliver path-scoped events under this prefix (None = all).
    /// Unscoped events are always delivered.
    pub path_prefix: Option<String>,
}

impl Default for RefreshFilter {
    fn default() -> Self {
        Self {
            buffer_size: 256,
            path_prefix: None,
        }
    }
}

impl RefreshFilter {
    /// Subscribe to one directory or file.
    pub fn under(prefix: impl Into<String>) -> Self {
        Self {
            path_prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub(crate) fn matches(&self, event: &RefreshEvent) -> bool {
        match (&self.path_prefix, &event.path) {
            (None, _) | (_, None) => true,
            (Some(prefix), Some(path)) => {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| prefix.ends_with('/') || rest.starts_with('/'))
            }
        }
    }
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to receive refresh events.
pub struct RefreshHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<RefreshEvent>,
}

impl RefreshHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<RefreshEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<RefreshEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<RefreshEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain every buffered event.
    pub fn drain(&self) -> Vec<RefreshEvent> {
        self.receiver.try_iter().collect()
    }
}
