//! Shell-style environment variable expansion
//!
//! Supports `$NAME` and `${NAME}`. Unset variables expand to the empty
//! string, matching shell semantics. A `$` that does not start a reference
//! is kept as-is.

use regex::{Captures, Regex};
use std::sync::OnceLock;

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([^}]*)\}|\$([A-Za-z0-9_]+)").expect("env reference pattern is valid")
    })
}

/// Expand references using the process environment
pub fn expand_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expand references using a custom lookup
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    reference_pattern()
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_default()
        })
        .into_owned()
}
