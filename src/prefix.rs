//! Base-URL prefix matching.
//!
//! A URL belongs to a source when it starts with the source's base URL and the
//! next character (if any) ends the authority: `/`, `?` or `#`. This keeps
//! `http://host:81` from matching the prefix `http://host:8`.

use crate::error::{ParkiveError, Result};
use std::borrow::Cow;

/// Returns true if `url` lies under `prefix` on an authority boundary.
///
/// An empty prefix matches everything; callers only pass validated base URLs.
pub fn matches(url: &str, prefix: &str) -> bool {
    match url.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

/// Moves `url` from `source_prefix` to `target_prefix`, keeping the suffix.
///
/// URLs outside `source_prefix` are returned unchanged (borrowed).
pub fn rewrite<'a>(url: &'a str, source_prefix: &str, target_prefix: &str) -> Cow<'a, str> {
    if !matches(url, source_prefix) {
        return Cow::Borrowed(url);
    }
    Cow::Owned(format!("{}{}", target_prefix, &url[source_prefix.len()..]))
}

/// Normalizes a user-supplied base URL to `scheme://host[:port]`.
///
/// Surrounding whitespace and trailing slashes are dropped. Anything past the
/// authority (path, query, fragment) is rejected.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let normalized = raw.trim().trim_end_matches('/');
    let invalid = |reason| ParkiveError::InvalidBaseUrl {
        input: raw.to_string(),
        reason,
    };

    let (scheme, rest) = normalized
        .split_once("://")
        .ok_or_else(|| invalid("base_url must be like http://host:port"))?;
    if !is_scheme(scheme) {
        return Err(invalid("base_url must be like http://host:port"));
    }

    let authority_end = rest.find(['/', '?', '#', ';']).unwrap_or(rest.len());
    if authority_end == 0 {
        return Err(invalid("base_url must be like http://host:port"));
    }
    if authority_end != rest.len() {
        return Err(invalid("base_url can only include scheme://host[:port]"));
    }

    Ok(normalized.to_string())
}

fn is_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
