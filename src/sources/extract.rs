//! Best-effort recovery of structured fields from free-text feed bodies.
//!
//! Each extractor is independent, returns an Option, and is chained by
//! the feed adapter in priority order with first-match-wins semantics.
//! Feeds have no reliable schema, so mis-extraction on atypical
//! formatting is an accepted tradeoff.

use std::sync::LazyLock;

use regex::Regex;

static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:duty station|location)\b[:\-]?\s*([^.;:|\n]{2,80})")
        .expect("location pattern")
});

static ORGANIZATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:organization|organisation|agency|employer|company)\b[:\-]?\s*([^.;:|\n]{2,80})")
        .expect("organization pattern")
});

/// Collapse runs of whitespace (including newlines from HTML-ish feed
/// bodies) so the patterns can match across formatting.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scan a text block for a `duty station:`/`location:` label.
pub fn extract_location(text: &str) -> Option<String> {
    capture(&LOCATION_RE, text)
}

/// Scan a text block for an `organization:`/`agency:`/`employer:` label.
pub fn extract_organization(text: &str) -> Option<String> {
    capture(&ORGANIZATION_RE, text)
}

/// Run one extractor over candidate blocks in priority order.
pub fn first_match<'a, I>(blocks: I, extractor: fn(&str) -> Option<String>) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    blocks.into_iter().find_map(extractor)
}

/// Split a title at the first colon into (prefix, remainder).
pub fn split_title_colon(title: &str) -> Option<(String, String)> {
    let (head, rest) = title.split_once(':')?;
    let head = head.trim();
    let rest = rest.trim();
    if head.is_empty() || rest.is_empty() {
        return None;
    }
    Some((head.to_string(), rest.to_string()))
}

/// Treat a short trailing comma-separated segment of a title as a
/// location: `"Programme Assistant, Nairobi"` -> `("Programme Assistant",
/// "Nairobi")`. Long trailing segments are left alone since they are
/// usually part of the role name, not a place.
pub fn split_trailing_location(title: &str) -> Option<(String, String)> {
    let (head, tail) = title.rsplit_once(',')?;
    let head = head.trim();
    let tail = tail.trim();
    if head.is_empty() || tail.is_empty() || tail.len() > 40 {
        return None;
    }
    Some((head.to_string(), tail.to_string()))
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_end_matches(',').to_string())
        .filter(|s| !s.is_empty())
}
