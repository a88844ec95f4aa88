//! Locating and parsing config documents along a search path.
//!
//! Each directory contributes at most one document: the first `key.<ext>`
//! that exists, trying extensions in handler registration order. Files are
//! read on every call; caching happens in [`crate::store`].

use crate::error::{ConfigError, Result};
use crate::handlers::{Handler, HandlerRegistry};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A parsed document and the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub value: Value,
}

/// Files that [`load`] would read for `key`, in search path order.
pub fn find_files<'r>(
    key: &str,
    search_path: &[PathBuf],
    registry: &'r HandlerRegistry,
) -> Vec<(PathBuf, &'r Handler)> {
    search_path
        .iter()
        .filter_map(|dir| find_in_dir(key, dir, registry))
        .collect()
}

fn find_in_dir<'r>(
    key: &str,
    dir: &Path,
    registry: &'r HandlerRegistry,
) -> Option<(PathBuf, &'r Handler)> {
    registry.iter().find_map(|handler| {
        let path = dir.join(format!("{}.{}", key, handler.extension()));
        path.is_file().then_some((path, handler))
    })
}

/// Read and parse every document for `key` along `search_path`.
///
/// Fails with [`ConfigError::FileNotFound`] when no directory has a file for
/// the key. Handler errors are returned unchanged.
pub fn load(
    key: &str,
    search_path: &[PathBuf],
    registry: &HandlerRegistry,
) -> Result<Vec<LoadedDocument>> {
    let mut documents = Vec::new();

    for (path, handler) in find_files(key, search_path, registry) {
        let contents =
            std::fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
        debug!(key, path = %path.display(), handler = handler.extension(), "parsing config file");
        let value = handler.parse(&contents)?;
        documents.push(LoadedDocument { path, value });
    }

    if documents.is_empty() {
        return Err(ConfigError::file_not_found(key, search_path));
    }
    Ok(documents)
}

/// Names of all keys with at least one recognized file on the search path.
///
/// Returned sorted and deduplicated. Missing directories are skipped.
pub fn all_key_names(search_path: &[PathBuf], registry: &HandlerRegistry) -> Vec<String> {
    let mut keys = BTreeSet::new();

    for dir in search_path {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable config directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            if !entry.path().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && let Some(key) = registry.lookup(name).and_then(|h| h.strip(name))
                && !key.is_empty()
            {
                keys.insert(key.to_string());
            }
        }
    }

    keys.into_iter().collect()
}
