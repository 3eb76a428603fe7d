//! Deterministic normalization of classifier responses.

/// Sentinel the classifier prompt asks for when nothing matches.
pub const UNKNOWN_KEY: &str = "unknown";

/// Result of resolving a classifier token against the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Token names a known catalog key.
    Known(String),
    /// Token is `unknown` or any key outside the catalog.
    Unresolved(String),
}

/// Normalize a raw classifier response into a key token.
///
/// Trims whitespace and lowercases. Surrounding quotes or backticks and a
/// trailing period are also dropped, since the prompt shows keys quoted.
pub fn normalize_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    trimmed
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_lowercase()
}

/// Resolve a normalized token against the known keys.
pub fn resolve_key<'a, I>(token: &str, known: I) -> Resolution
where
    I: IntoIterator<Item = &'a str>,
{
    if token != UNKNOWN_KEY && known.into_iter().any(|key| key == token) {
        Resolution::Known(token.to_string())
    } else {
        Resolution::Unresolved(token.to_string())
    }
}
