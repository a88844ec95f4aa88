//! Error types for config resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building settings or resolving a config key.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No directory in the search path holds a file for the key.
    #[error("can't find config files for key: {key:?}")]
    FileNotFound {
        key: String,
        /// Directories that were searched, in order.
        searched: Vec<PathBuf>,
    },

    /// A combined overlay names an axis that was never defined.
    #[error("no such overlay: {0:?}")]
    UnknownOverlay(String),

    /// Mutation of a cached value on a frozen facade.
    #[error("config key {0:?} is frozen")]
    Frozen(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A handler rejected the file contents. Passed through as-is.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    #[error("config key {key:?} does not match the requested type: {source}")]
    Convert {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid loader options: {0}")]
    Options(#[from] serde_yaml::Error),
}

impl ConfigError {
    pub fn file_not_found(key: &str, searched: &[PathBuf]) -> Self {
        Self::FileNotFound {
            key: key.to_string(),
            searched: searched.to_vec(),
        }
    }

    pub fn unknown_overlay(axis: &str) -> Self {
        Self::UnknownOverlay(axis.to_string())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the "key has no file anywhere" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }
}

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
