//! Loader settings as a YAML document.
//!
//! ```yaml
//! roots: [/srv/app/config]
//! overlays:
//!   - axis: default            # no value: the root itself
//!   - axis: environment
//!     value: prod
//!   - axis: local
//!     value: [local, developer]
//! combined:
//!   - [environment, local]
//! always_reload: false
//! preload: true
//! freeze: true
//! ```

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Serializable form of [`crate::Settings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoaderOptions {
    /// Roots, highest precedence last. Empty keeps the working directory.
    #[serde(default)]
    pub roots: Vec<PathBuf>,

    #[serde(default)]
    pub overlays: Vec<OverlayOption>,

    /// Pairs of axis names to combine, applied after `overlays`.
    #[serde(default)]
    pub combined: Vec<(String, String)>,

    #[serde(default)]
    pub always_reload: bool,

    #[serde(default)]
    pub preload: bool,

    #[serde(default)]
    pub preload_keys: Vec<String>,

    #[serde(default)]
    pub freeze: bool,
}

/// One overlay axis entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayOption {
    pub axis: String,

    /// Missing or null means the root itself. An empty list defines nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<OneOrMany>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OverlayOption {
    /// One entry per overlay to define. `None` is a root overlay.
    pub fn values(&self) -> Vec<Option<&str>> {
        match &self.value {
            None => vec![None],
            Some(OneOrMany::One(v)) => vec![Some(v.as_str())],
            Some(OneOrMany::Many(vs)) => vs.iter().map(|v| Some(v.as_str())).collect(),
        }
    }
}

impl LoaderOptions {
    /// Load options from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
