//! Data extraction from page text
//!
//! All discovery in dragnet is regex-based: the user's target pattern pulls
//! data out of a page through a named capture group, and a canned pattern
//! pulls out anchor hrefs for link following. Full HTML parsing is
//! deliberately out of scope.

use crate::{CrawlError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Name of the capture group whose value is extracted by [`find_all`].
pub const TARGET_GROUP: &str = "target";

/// Anchor-href pattern used by [`find_links`]. Accepts double- or
/// single-quoted href values.
fn link_regex() -> &'static Regex {
    static LINK_RE: OnceLock<Regex> = OnceLock::new();
    LINK_RE.get_or_init(|| {
        Regex::new(r#"<a\s+(?:[^>]*?\s+)?href=(?:"(?P<target>[^"]*)"|'(?P<target_sq>[^']*)')"#)
            .expect("link pattern is valid")
    })
}

/// Compiles a target pattern, failing with [`CrawlError::InvalidPattern`].
///
/// Called once at crawl construction time so a bad pattern surfaces
/// synchronously, never mid-crawl. The pattern is expected to carry a
/// `target` named capture group; a pattern without one is a caller
/// configuration error and simply yields no matches.
pub fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(CrawlError::InvalidPattern)
}

/// Returns every value captured by the pattern's `target` group, in input
/// order, one entry per match.
pub fn find_all(input: &str, regex: &Regex) -> Vec<String> {
    regex
        .captures_iter(input)
        .filter_map(|caps| caps.name(TARGET_GROUP))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Returns the href value of every anchor tag in the input, in input order.
pub fn find_links(input: &str) -> Vec<String> {
    // The regex crate forbids duplicate capture group names, so the two
    // quote-style branches capture under different names; take whichever
    // branch matched.
    link_regex()
        .captures_iter(input)
        .filter_map(|caps| caps.name(TARGET_GROUP).or_else(|| caps.name("target_sq")))
        .map(|m| m.as_str().to_string())
        .collect()
}
