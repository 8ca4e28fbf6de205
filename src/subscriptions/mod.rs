//! UI-refresh notifications.
//!
//! Components publish a [`RefreshEvent`] after any change a view of the
//! history should reflect:
//! - Version created by an approved save
//! - Version deleted, history cleaned or cleared
//! - Commit annotation pass finished
//!
//! Each subscriber gets a bounded buffer. Subscribers that fall behind are
//! disconnected rather than blocking the publisher.
//!
//! # Example
//!
//! ```ignore
//! let notifier = RefreshNotifier::new();
//! let handle = notifier.subscribe(RefreshFilter::default());
//!
//! while let Ok(event) = handle.recv() {
//!     match event.path {
//!         Some(path) => redraw_file(&path),
//!         None => redraw_all(),
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::RefreshNotifier;
pub use types::{RefreshCause, RefreshEvent, RefreshFilter, RefreshHandle, SubscriptionId};
