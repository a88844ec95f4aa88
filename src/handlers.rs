//! File extension to parser dispatch.
//!
//! Handlers are kept in registration order. Lookups scan that order and the
//! earliest registration whose extension is a literal dotted suffix of the
//! filename wins.

use anyhow::Result;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Parser turning raw file text into a structured value.
pub type ParseFn = Arc<dyn Fn(&str) -> Result<Value> + Send + Sync>;

/// One extension bound to a parser.
#[derive(Clone)]
pub struct Handler {
    extension: String,
    parse: ParseFn,
}

impl Handler {
    /// Extension without the leading dot, e.g. `yml.tmpl`.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Parse file contents.
    pub fn parse(&self, contents: &str) -> Result<Value> {
        (self.parse)(contents)
    }

    /// Whether `filename` ends in `.<extension>`. Case-sensitive.
    pub fn matches(&self, filename: &str) -> bool {
        filename
            .strip_suffix(self.extension.as_str())
            .is_some_and(|stem| stem.ends_with('.'))
    }

    /// `filename` with `.<extension>` removed, if it matches.
    pub fn strip<'a>(&self, filename: &'a str) -> Option<&'a str> {
        filename
            .strip_suffix(self.extension.as_str())
            .and_then(|stem| stem.strip_suffix('.'))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

/// Ordered list of handlers.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<Handler>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in YAML, templated YAML and JSON handlers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(&["yml", "yaml"], parse_yaml);
        registry.register(&["yml.tmpl", "yaml.tmpl"], parse_templated_yaml);
        registry.register(&["json"], parse_json);
        registry
    }

    /// Append one entry per extension, all sharing `parse`.
    ///
    /// Leading dots are accepted and dropped (`".xml"` is `"xml"`).
    pub fn register<F>(&mut self, extensions: &[&str], parse: F)
    where
        F: Fn(&str) -> Result<Value> + Send + Sync + 'static,
    {
        let parse: ParseFn = Arc::new(parse);
        for ext in extensions {
            self.handlers.push(Handler {
                extension: ext.trim_start_matches('.').to_string(),
                parse: Arc::clone(&parse),
            });
        }
    }

    /// First handler, in registration order, matching `filename`.
    pub fn lookup(&self, filename: &str) -> Option<&Handler> {
        self.handlers.iter().find(|h| h.matches(filename))
    }

    /// Registered extensions, in registration order (duplicates included).
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|h| h.extension.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handler> {
        self.handlers.iter()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Parse YAML into a JSON value.
pub fn parse_yaml(contents: &str) -> Result<Value> {
    Ok(serde_yaml::from_str::<Value>(contents)?)
}

/// Expand `${VAR}` placeholders from the environment, then parse as YAML.
pub fn parse_templated_yaml(contents: &str) -> Result<Value> {
    let expanded = crate::template::expand(contents)?;
    parse_yaml(&expanded)
}

pub fn parse_json(contents: &str) -> Result<Value> {
    Ok(serde_json::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_extensions_in_order() {
        let registry = HandlerRegistry::with_defaults();
        let exts: Vec<_> = registry.extensions().collect();
        assert_eq!(exts, vec!["yml", "yaml", "yml.tmpl", "yaml.tmpl", "json"]);
    }

    #[test]
    fn test_lookup_by_suffix() {
        let registry = HandlerRegistry::with_defaults();
        assert_eq!(registry.lookup("values.yml").unwrap().extension(), "yml");
        assert_eq!(registry.lookup("values.yaml").unwrap().extension(), "yaml");
        assert_eq!(
            registry.lookup("values.yml.tmpl").unwrap().extension(),
            "yml.tmpl"
        );
        assert_eq!(registry.lookup("values.json").unwrap().extension(), "json");
        assert!(registry.lookup("values.toml").is_none());
    }

    #[test]
    fn test_lookup_is_case_sensitive_and_dotted() {
        let registry = HandlerRegistry::with_defaults();
        assert!(registry.lookup("values.YML").is_none());
        // "yml" must be preceded by a dot.
        assert!(registry.lookup("valuesyml").is_none());
    }

    #[test]
    fn test_earliest_registration_wins() {
        let mut registry = HandlerRegistry::new();
        registry.register(&["yml"], |_| Ok(json!("first")));
        registry.register(&["yml"], |_| Ok(json!("second")));

        let handler = registry.lookup("a.yml").unwrap();
        assert_eq!(handler.parse("").unwrap(), json!("first"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_strips_leading_dot() {
        let mut registry = HandlerRegistry::new();
        registry.register(&[".xml"], |_| Ok(Value::Null));
        assert_eq!(registry.extensions().collect::<Vec<_>>(), vec!["xml"]);
        assert!(registry.lookup("feed.xml").is_some());
    }

    #[test]
    fn test_strip_extension() {
        let registry = HandlerRegistry::with_defaults();
        let handler = registry.lookup("database.yaml.tmpl").unwrap();
        assert_eq!(handler.strip("database.yaml.tmpl"), Some("database"));
        assert_eq!(handler.strip("database.json"), None);
    }

    #[test]
    fn test_parse_yaml_and_json() {
        assert_eq!(
            parse_yaml("foo: 1\nbar: [a, b]").unwrap(),
            json!({"foo": 1, "bar": ["a", "b"]})
        );
        assert_eq!(parse_yaml("foo bar baz").unwrap(), json!("foo bar baz"));
        assert_eq!(
            parse_json(r#"{ "json": true }"#).unwrap(),
            json!({"json": true})
        );
    }

    #[test]
    fn test_parse_errors_propagate() {
        assert!(parse_json("{ not json").is_err());
        assert!(parse_yaml("foo: [unterminated").is_err());
    }

    #[test]
    fn test_templated_yaml_uses_fallback() {
        let value =
            parse_templated_yaml("port: ${OVERLAY_CONFIG_TEST_SURELY_UNSET:-8080}").unwrap();
        assert_eq!(value, json!({"port": 8080}));
    }
}
