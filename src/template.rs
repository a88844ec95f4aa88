//! Placeholder expansion for templated config files.
//!
//! Supported forms:
//! - `${NAME}` - value of `NAME`, error if unset
//! - `${NAME:-fallback}` - value of `NAME`, or `fallback` if unset
//! - `$${` - a literal `${`

use anyhow::{Result, bail};
use regex_lite::{Captures, Regex};
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$(\$)?\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("placeholder pattern is valid")
    })
}

/// Expand placeholders using process environment variables.
pub fn expand(text: &str) -> Result<String> {
    expand_with(text, |name| std::env::var(name).ok())
}

/// Expand placeholders using `lookup` to resolve names.
pub fn expand_with<F>(text: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in placeholder().captures_iter(text) {
        let whole = caps.get(0).expect("capture 0 always matches");
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        if caps.get(1).is_some() {
            // Escaped: drop one `$` and keep the rest verbatim.
            out.push_str(&whole.as_str()[1..]);
            continue;
        }

        out.push_str(&resolve(&caps, &lookup)?);
    }

    out.push_str(&text[last..]);
    Ok(out)
}

fn resolve<F>(caps: &Captures<'_>, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let name = &caps[2];
    match (lookup(name), caps.get(3)) {
        (Some(value), _) => Ok(value),
        (None, Some(fallback)) => Ok(fallback.as_str().to_string()),
        (None, None) => bail!("template variable {} is not set", name),
    }
}
