//! Cached access to resolved config keys.
//!
//! Resolving a key runs search path construction, document loading and the
//! deep merge, using the settings as they are at call time. Results are
//! cached per key unless `always_reload` is set. Resolved values are handed
//! out as `Arc<Value>` and never mutated in place.

use crate::error::{ConfigError, Result};
use crate::loader;
use crate::merge::deep_merge_all;
use crate::options::LoaderOptions;
use crate::settings::Settings;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Resolved values in resolution order.
#[derive(Debug, Default)]
struct Cache {
    entries: HashMap<String, Arc<Value>>,
    order: Vec<String>,
}

impl Cache {
    fn insert(&mut self, key: &str, value: Arc<Value>) {
        if self.entries.insert(key.to_string(), value).is_none() {
            self.order.push(key.to_string());
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Layered config facade.
///
/// ```no_run
/// use overlay_config::Config;
///
/// let config = Config::build(|settings| {
///     settings
///         .set_root("/srv/app/config")
///         .define_overlay("default", None)
///         .define_deferred_overlay("environment", || std::env::var("APP_ENV").ok());
///     Ok(())
/// })?;
///
/// let database = config.get("database")?;
/// println!("{}", database["host"]);
/// # Ok::<(), overlay_config::ConfigError>(())
/// ```
pub struct Config {
    settings: Settings,
    cache: Mutex<Cache>,
}

impl Config {
    /// Create a facade. Preloads keys if the settings ask for it.
    pub fn new(settings: Settings) -> Result<Self> {
        let config = Self {
            settings,
            cache: Mutex::new(Cache::default()),
        };
        if config.settings.is_preload() {
            config.preload()?;
        }
        Ok(config)
    }

    /// Configure default settings with `configure`, then create the facade.
    pub fn build<F>(configure: F) -> Result<Self>
    where
        F: FnOnce(&mut Settings) -> Result<()>,
    {
        let mut settings = Settings::new();
        configure(&mut settings)?;
        Self::new(settings)
    }

    pub fn from_options(options: &LoaderOptions) -> Result<Self> {
        Self::new(Settings::from_options(options)?)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Changes apply to the next resolution. Cached keys are kept.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Resolved value for `key`, from cache when allowed.
    pub fn get(&self, key: &str) -> Result<Arc<Value>> {
        if !self.settings.is_always_reload()
            && let Some(value) = self.lock().entries.get(key)
        {
            debug!(key, "config cache hit");
            return Ok(Arc::clone(value));
        }

        let value = Arc::new(self.resolve(key)?);
        let mut cache = self.lock();
        if !self.settings.is_always_reload()
            && let Some(existing) = cache.entries.get(key)
        {
            // Another caller resolved it first; keep one shared value.
            return Ok(Arc::clone(existing));
        }
        cache.insert(key, Arc::clone(&value));
        Ok(value)
    }

    /// Resolved value deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.get(key)?;
        T::deserialize(&*value).map_err(|source| ConfigError::Convert {
            key: key.to_string(),
            source,
        })
    }

    /// Look up a dotted path (`"server.ports.0"`) inside the value for `key`.
    ///
    /// Numeric segments index into sequences. `Ok(None)` if the path does
    /// not exist.
    pub fn get_path(&self, key: &str, path: &str) -> Result<Option<Value>> {
        let value = self.get(key)?;
        Ok(lookup_path(&value, path).cloned())
    }

    /// Whether `key` has a file anywhere on the search path.
    ///
    /// Resolves (and caches) the key; other errors are returned.
    pub fn contains_key(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Run the full pipeline for `key`, bypassing the cache.
    pub fn resolve(&self, key: &str) -> Result<Value> {
        let search_path = self.settings.search_path();
        let documents = loader::load(key, &search_path, self.settings.handlers())?;
        debug!(key, files = documents.len(), "merging config documents");

        deep_merge_all(documents.into_iter().map(|d| d.value))
            .ok_or_else(|| ConfigError::file_not_found(key, &search_path))
    }

    /// Re-resolve `key` and replace its cached value.
    pub fn reload(&self, key: &str) -> Result<Arc<Value>> {
        let value = Arc::new(self.resolve(key)?);
        self.lock().insert(key, Arc::clone(&value));
        Ok(value)
    }

    /// Drop every cached value.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Apply `edit` to a copy of the value for `key` and cache the result.
    ///
    /// Values handed out earlier are unaffected. Fails with
    /// [`ConfigError::Frozen`] when `freeze` is enabled.
    pub fn update<F>(&self, key: &str, edit: F) -> Result<Arc<Value>>
    where
        F: FnOnce(&mut Value),
    {
        if self.settings.is_frozen() {
            return Err(ConfigError::Frozen(key.to_string()));
        }

        let mut value = Value::clone(&*self.get(key)?);
        edit(&mut value);
        let value = Arc::new(value);
        self.lock().insert(key, Arc::clone(&value));
        Ok(value)
    }

    /// Resolve the declared preload keys, or every discoverable key.
    ///
    /// Returns how many keys were resolved.
    pub fn preload(&self) -> Result<usize> {
        let keys = match self.settings.declared_preload_keys() {
            [] => loader::all_key_names(&self.settings.search_path(), self.settings.handlers()),
            declared => declared.to_vec(),
        };

        for key in &keys {
            self.get(key)?;
        }
        info!(keys = keys.len(), "preloaded config keys");
        Ok(keys.len())
    }

    /// Keys resolved so far, in resolution order.
    pub fn resolved_keys(&self) -> Vec<String> {
        self.lock().order.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lookup_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self.resolved_keys();
        if keys.is_empty() {
            write!(f, "Config (empty)")
        } else {
            write!(f, "Config ({} keys): {}", keys.len(), keys.join(" "))
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("settings", &self.settings)
            .field("resolved", &self.resolved_keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn config_at(temp: &TempDir) -> Config {
        let root = temp.path().to_path_buf();
        Config::build(move |s| {
            s.set_root(&root);
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn test_config_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Config>();
    }

    #[test]
    fn test_get_caches() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "values.yml", "foo: 1");
        let config = config_at(&temp);

        let first = config.get("values").unwrap();
        write(temp.path(), "values.yml", "foo: 2");
        let second = config.get("values").unwrap();

        assert_eq!(*second, json!({"foo": 1}));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_always_reload_rereads() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "values.yml", "foo: 1");
        let root = temp.path().to_path_buf();
        let config = Config::build(move |s| {
            s.set_root(&root).always_reload(true);
            Ok(())
        })
        .unwrap();

        assert_eq!(*config.get("values").unwrap(), json!({"foo": 1}));
        write(temp.path(), "values.yml", "foo: 2");
        assert_eq!(*config.get("values").unwrap(), json!({"foo": 2}));
        assert_eq!(config.resolved_keys(), vec!["values"]);
    }

    #[test]
    fn test_reload_and_clear() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "values.yml", "foo: 1");
        let config = config_at(&temp);

        config.get("values").unwrap();
        write(temp.path(), "values.yml", "foo: 2");
        assert_eq!(*config.reload("values").unwrap(), json!({"foo": 2}));
        assert_eq!(*config.get("values").unwrap(), json!({"foo": 2}));

        config.clear();
        assert!(config.is_empty());
    }

    #[test]
    fn test_failures_are_not_cached() {
        let temp = TempDir::new().unwrap();
        let config = config_at(&temp);

        assert!(config.get("values").unwrap_err().is_not_found());
        assert!(config.is_empty());

        write(temp.path(), "values.yml", "foo: 1");
        assert_eq!(*config.get("values").unwrap(), json!({"foo": 1}));
    }

    #[test]
    fn test_display_lists_resolved_keys() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "values.yml", "foo: 1");
        write(temp.path(), "wtf.yml", "bar: 2");
        let config = config_at(&temp);

        assert_eq!(config.to_string(), "Config (empty)");
        config.get("values").unwrap();
        assert_eq!(config.to_string(), "Config (1 keys): values");
        config.get("wtf").unwrap();
        assert_eq!(config.to_string(), "Config (2 keys): values wtf");
        assert_eq!(config.len(), 2);
    }

    #[test]
    fn test_get_as_typed() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Database {
            host: String,
            port: u16,
        }

        let temp = TempDir::new().unwrap();
        write(temp.path(), "database.yml", "host: localhost\nport: 5432");
        let config = config_at(&temp);

        let db: Database = config.get_as("database").unwrap();
        assert_eq!(
            db,
            Database {
                host: "localhost".into(),
                port: 5432
            }
        );

        let err = config.get_as::<Vec<String>>("database").unwrap_err();
        assert!(matches!(err, ConfigError::Convert { .. }));
    }

    #[test]
    fn test_get_path() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "server.yml",
            "listen:\n  host: 0.0.0.0\n  ports: [80, 443]\n",
        );
        let config = config_at(&temp);

        assert_eq!(
            config.get_path("server", "listen.host").unwrap(),
            Some(json!("0.0.0.0"))
        );
        assert_eq!(
            config.get_path("server", "listen.ports.1").unwrap(),
            Some(json!(443))
        );
        assert_eq!(config.get_path("server", "listen.missing").unwrap(), None);
        assert_eq!(config.get_path("server", "listen.host.deeper").unwrap(), None);
    }

    #[test]
    fn test_contains_key() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "values.yml", "foo: 1");
        write(temp.path(), "broken.json", "{");
        let config = config_at(&temp);

        assert!(config.contains_key("values").unwrap());
        assert!(!config.contains_key("nothing").unwrap());
        assert!(config.contains_key("broken").is_err());
    }

    #[test]
    fn test_update_copy_on_write() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "values.yml", "foo: 1");
        let config = config_at(&temp);

        let before = config.get("values").unwrap();
        let after = config
            .update("values", |v| v["foo"] = json!(2))
            .unwrap();

        assert_eq!(*before, json!({"foo": 1}));
        assert_eq!(*after, json!({"foo": 2}));
        assert_eq!(*config.get("values").unwrap(), json!({"foo": 2}));
    }

    #[test]
    fn test_update_resolves_uncached_key() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "values.yml", "foo: 1\nbar: x");
        let config = config_at(&temp);
        assert!(config.is_empty());

        let after = config
            .update("values", |v| v["foo"] = json!(3))
            .unwrap();
        assert_eq!(*after, json!({"foo": 3, "bar": "x"}));
        assert_eq!(config.resolved_keys(), vec!["values".to_string()]);
    }

    #[test]
    fn test_update_rejected_when_frozen() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "values.yml", "foo: 1");
        let root = temp.path().to_path_buf();
        let config = Config::build(move |s| {
            s.set_root(&root).freeze(true);
            Ok(())
        })
        .unwrap();

        let err = config.update("values", |v| v["foo"] = json!(2)).unwrap_err();
        assert!(matches!(err, ConfigError::Frozen(ref k) if k == "values"));
        assert_eq!(*config.get("values").unwrap(), json!({"foo": 1}));
    }

    #[test]
    fn test_preload_discovers_keys() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "values.yml", "foo: 1");
        write(temp.path(), "prod/cache.json", r#"{"ttl": 30}"#);
        write(temp.path(), "prod/values.yml", "foo: 2");
        let root = temp.path().to_path_buf();

        let config = Config::build(move |s| {
            s.set_root(&root)
                .define_overlay("default", None)
                .define_overlay("environment", Some("prod"))
                .preload(true);
            Ok(())
        })
        .unwrap();

        assert_eq!(config.resolved_keys(), vec!["cache", "values"]);
        assert_eq!(*config.get("values").unwrap(), json!({"foo": 2}));
    }

    #[test]
    fn test_preload_declared_keys() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "values.yml", "foo: 1");
        write(temp.path(), "other.yml", "bar: 1");
        let root = temp.path().to_path_buf();

        let config = Config::build(move |s| {
            s.set_root(&root).preload(true).preload_keys(["values"]);
            Ok(())
        })
        .unwrap();
        assert_eq!(config.resolved_keys(), vec!["values"]);
    }

    #[test]
    fn test_preload_failure_fails_construction() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let result = Config::build(move |s| {
            s.set_root(&root).preload(true).preload_keys(["missing"]);
            Ok(())
        });
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_settings_changes_apply_to_next_resolution() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "values.yml", "foo: 1");
        write(temp.path(), "prod/values.yml", "foo: 2");
        let mut config = config_at(&temp);

        assert_eq!(config.resolve("values").unwrap(), json!({"foo": 1}));
        config
            .settings_mut()
            .define_overlay("default", None)
            .define_overlay("environment", Some("prod"));
        assert_eq!(config.resolve("values").unwrap(), json!({"foo": 2}));
    }

    #[test]
    fn test_lookup_path_empty_returns_root() {
        let value = json!({"a": 1});
        assert_eq!(lookup_path(&value, ""), Some(&value));
    }
}
