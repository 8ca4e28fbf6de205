//! Persistent store of files and their versions.
//!
//! Files and versions live in SQLite. Version numbers are assigned inside
//! the same transaction as the row insert, so a file's sequence never
//! has gaps at creation time. The current-version pointer is maintained
//! on every create and delete.

mod schema;
mod store;

pub use schema::{SCHEMA, SCHEMA_VERSION};
pub use store::{OpenReport, VersionStore};
