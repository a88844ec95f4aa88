//! Loader settings: roots, overlays, handlers and behaviour flags.

use crate::error::Result;
use crate::handlers::HandlerRegistry;
use crate::options::LoaderOptions;
use crate::overlay::OverlaySet;
use crate::search_path::{self, current_dir, expand_path};
use anyhow::Result as AnyResult;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Everything the resolution pipeline needs.
///
/// Starts with the current working directory as the only root and the
/// default handlers registered.
#[derive(Debug, Clone)]
pub struct Settings {
    roots: Vec<PathBuf>,
    overlays: OverlaySet,
    handlers: HandlerRegistry,
    always_reload: bool,
    preload: bool,
    preload_keys: Vec<String>,
    freeze: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub fn new() -> Self {
        Self {
            roots: vec![current_dir()],
            overlays: OverlaySet::new(),
            handlers: HandlerRegistry::with_defaults(),
            always_reload: false,
            preload: false,
            preload_keys: Vec::new(),
            freeze: false,
        }
    }

    /// Build settings from a parsed options document.
    ///
    /// Overlays are defined in document order, then combined overlays.
    pub fn from_options(options: &LoaderOptions) -> Result<Self> {
        let mut settings = Self::new();

        if let Some((first, rest)) = options.roots.split_first() {
            settings.set_root(first);
            for root in rest {
                settings.prefix_root(root);
            }
        }

        for overlay in &options.overlays {
            for value in overlay.values() {
                settings.define_overlay(&overlay.axis, value);
            }
        }

        for (first, second) in &options.combined {
            settings.define_combined_overlay(first, second)?;
        }

        settings
            .always_reload(options.always_reload)
            .preload(options.preload)
            .preload_keys(options.preload_keys.iter().cloned())
            .freeze(options.freeze);
        Ok(settings)
    }

    // Roots

    /// Replace all roots with `path`.
    pub fn set_root(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.roots = vec![expand_path(path)];
        self
    }

    /// Add a root searched before the existing ones, so it has lower
    /// precedence within each overlay.
    pub fn add_root(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.roots.insert(0, expand_path(path));
        self
    }

    /// Add a root searched after the existing ones.
    pub fn prefix_root(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.roots.push(expand_path(path));
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    // Overlays

    /// Define an overlay. `None` searches each root itself.
    pub fn define_overlay(&mut self, axis: &str, value: Option<&str>) -> &mut Self {
        self.overlays.define(axis, value);
        self
    }

    /// Define several overlays on the same axis.
    pub fn define_overlay_values<I, S>(&mut self, axis: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overlays.define_values(axis, values);
        self
    }

    /// Define an overlay whose value is computed when keys are resolved.
    ///
    /// ```
    /// use overlay_config::Settings;
    ///
    /// let mut settings = Settings::new();
    /// settings.define_deferred_overlay("environment", || std::env::var("APP_ENV").ok());
    /// ```
    pub fn define_deferred_overlay<F>(&mut self, axis: &str, produce: F) -> &mut Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.overlays.define_deferred(axis, produce);
        self
    }

    /// Define a deferred overlay that expands to several values, or none.
    pub fn define_deferred_overlay_values<F>(&mut self, axis: &str, produce: F) -> &mut Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.overlays.define_deferred_values(axis, produce);
        self
    }

    /// Define an overlay from the cross product of two existing axes.
    pub fn define_combined_overlay(&mut self, first: &str, second: &str) -> Result<&mut Self> {
        self.overlays.define_combined(first, second)?;
        Ok(self)
    }

    pub fn overlays(&self) -> &OverlaySet {
        &self.overlays
    }

    // Handlers

    /// Register `parse` for each extension, after the existing handlers.
    pub fn define_handler<F>(&mut self, extensions: &[&str], parse: F) -> &mut Self
    where
        F: Fn(&str) -> AnyResult<Value> + Send + Sync + 'static,
    {
        self.handlers.register(extensions, parse);
        self
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Drop every handler, including the defaults.
    pub fn clear_handlers(&mut self) -> &mut Self {
        self.handlers = HandlerRegistry::new();
        self
    }

    // Flags

    /// Re-read files on every access instead of caching.
    pub fn always_reload(&mut self, enabled: bool) -> &mut Self {
        self.always_reload = enabled;
        self
    }

    /// Resolve keys eagerly when the facade is constructed.
    pub fn preload(&mut self, enabled: bool) -> &mut Self {
        self.preload = enabled;
        self
    }

    /// Keys to resolve on preload. When empty, keys are discovered from the
    /// files on the search path.
    pub fn preload_keys<I, S>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preload_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Refuse in-place updates of resolved values.
    pub fn freeze(&mut self, enabled: bool) -> &mut Self {
        self.freeze = enabled;
        self
    }

    pub fn is_always_reload(&self) -> bool {
        self.always_reload
    }

    pub fn is_preload(&self) -> bool {
        self.preload
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze
    }

    pub fn declared_preload_keys(&self) -> &[String] {
        &self.preload_keys
    }

    /// Directories to search, in precedence order (lowest first).
    pub fn search_path(&self) -> Vec<PathBuf> {
        search_path::build(&self.roots, &self.overlays)
    }
}
