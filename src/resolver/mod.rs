//! Link address resolution
//!
//! Raw link strings pulled out of page text arrive in every imaginable shape:
//! fully qualified addresses, site-relative paths, paths missing their leading
//! slash, and bare domain fragments without a scheme. This module turns them
//! into absolute addresses against the page they were found on, and answers
//! whether two addresses live on the same host.

use url::Url;

/// Resolves a raw link string into an absolute address against `base`.
///
/// Resolution cascade, each step tried only when the previous one fails:
///
/// 1. The link already parses as an absolute address — used as-is.
/// 2. The link is a path-relative reference — joined onto `base`.
/// 3. A relative-looking link that lacks its leading slash gets one prepended
///    and is joined onto `base`.
/// 4. A bare host fragment missing its scheme (first path segment contains a
///    dot, e.g. `c.com` or `c.com/path`) is given `base`'s scheme:
///    `resolve("c.com", "http://h/x")` yields `http://c.com/`.
///
/// Anything that survives none of the steps resolves to `None` and the caller
/// is expected to discard the link silently — an unusable link is not an
/// error. Empty links resolve to `None`.
pub fn resolve(raw: &str, base: &Url) -> Option<Url> {
    if raw.is_empty() {
        return None;
    }

    // Step 1: already absolute.
    if let Ok(url) = Url::parse(raw) {
        return Some(url);
    }

    // Step 4 is tried ahead of the relative joins for host-shaped links,
    // otherwise `c.com` would silently become a path on the base host.
    if looks_like_bare_host(raw) {
        let candidate = format!("{}://{}", base.scheme(), raw);
        if let Ok(url) = Url::parse(&candidate) {
            return Some(url);
        }
    }

    // Step 2: path-relative reference.
    if let Ok(url) = base.join(raw) {
        return Some(url);
    }

    // Step 3: retry with a leading slash.
    if !raw.starts_with('/') {
        if let Ok(url) = base.join(&format!("/{raw}")) {
            return Some(url);
        }
    }

    None
}

/// True when a schemeless link reads as a host fragment rather than a path:
/// it does not start with `/`, `.`, `?` or `#` and its first path segment
/// contains a dot.
fn looks_like_bare_host(raw: &str) -> bool {
    if raw.starts_with(['/', '.', '?', '#']) {
        return false;
    }
    let first_segment = raw.split('/').next().unwrap_or("");
    first_segment.contains('.')
}

/// Resolves the crawl's starting address.
///
/// Unlike in-page links, the root has no base to resolve against, so a
/// missing scheme is tolerated and defaults to `http`. The result must carry
/// a host; anything else is unusable as a crawl root.
pub fn resolve_root(raw: &str) -> Option<Url> {
    Url::parse(raw)
        .ok()
        .filter(|u| u.host_str().is_some())
        .or_else(|| {
            Url::parse(&format!("http://{raw}"))
                .ok()
                .filter(|u| u.host_str().is_some())
        })
}

/// Tests whether two addresses share a host.
///
/// Host components are compared byte-for-byte; no case, port or trailing-dot
/// normalization beyond what URL parsing itself performs.
pub fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str()
}
