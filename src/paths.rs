//! Workspace-relative path normalization.
//!
//! Every path stored in the version store, and every path compared against
//! a staged set, goes through [`normalize`] so that `./src\lib.rs`,
//! `src/lib.rs` and `/ws/src/lib.rs` all map to `src/lib.rs`.

use std::path::{Component, Path};

/// Normalize `path` to a `/`-separated path relative to `workspace_root`.
///
/// Relative inputs are taken as already workspace-relative. Returns `None`
/// for paths outside the workspace or that name the workspace itself.
pub fn normalize(workspace_root: &Path, path: &Path) -> Option<String> {
    let relative = if path.has_root() {
        path.strip_prefix(workspace_root).ok()?
    } else {
        path
    };

    let mut parts: Vec<String> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// [`normalize`] for editor-supplied strings, which may use `\` separators.
pub fn normalize_str(workspace_root: &Path, path: &str) -> Option<String> {
    let unified = path.replace('\\', "/");
    normalize(workspace_root, Path::new(&unified))
}
