//! Search path construction.
//!
//! The search path is every overlay (outer, definition order) applied to
//! every root (inner, root order), with duplicates removed keeping the first
//! occurrence. Later entries take precedence when documents are merged.

use crate::overlay::OverlaySet;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Build the ordered list of directories to search.
///
/// With no overlays the roots are returned unchanged.
pub fn build(roots: &[PathBuf], overlays: &OverlaySet) -> Vec<PathBuf> {
    if overlays.is_empty() {
        return roots.to_vec();
    }
    build_from_values(roots, &overlays.values())
}

/// [`build`] over already resolved overlay values.
pub fn build_from_values(roots: &[PathBuf], values: &[Option<String>]) -> Vec<PathBuf> {
    if values.is_empty() {
        return roots.to_vec();
    }

    let mut seen = HashSet::new();
    let mut dirs = Vec::with_capacity(values.len() * roots.len());

    for value in values {
        for root in roots {
            let dir = match value {
                Some(sub) => overlay_dir(root, sub),
                None => root.clone(),
            };
            if seen.insert(dir.clone()) {
                dirs.push(dir);
            }
        }
    }

    debug!(
        roots = roots.len(),
        overlays = values.len(),
        dirs = dirs.len(),
        "built search path"
    );
    dirs
}

/// Join an overlay value under `root`.
///
/// Root and prefix components of `sub` are dropped, so `/prod` still lands
/// in `root/prod`.
fn overlay_dir(root: &Path, sub: &str) -> PathBuf {
    let relative: PathBuf = Path::new(sub)
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    normalize_path_components(&root.join(relative))
}

/// Turn a user supplied root into an absolute, normalized path.
///
/// `~` and `~/...` resolve against the home directory. Relative paths
/// resolve against the current working directory.
pub fn expand_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();

    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        current_dir().join(expanded)
    };
    normalize_path_components(&absolute)
}

pub(crate) fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Lexically remove `.` and resolvable `..` components.
fn normalize_path_components(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                } else if !matches!(components.last(), Some(Component::RootDir)) {
                    components.push(Component::ParentDir);
                }
            }
            other => components.push(other),
        }
    }

    components.iter().collect()
}
