//! Crawl configuration
//!
//! A [`CrawlConfig`] is supplied once, validated up front by
//! [`crate::crawler::crawl`], and never mutated afterwards.

use crate::client::{FetchCapability, PoolSettings};
use crate::sink::ResultSink;
use std::sync::Arc;

/// Link-discovery function: page text in, raw link strings out.
///
/// Defaults to the canned anchor-href extractor
/// ([`crate::extract::find_links`]); override it to follow links found some
/// other way.
pub type LinkDiscovery = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Immutable crawl configuration.
///
/// The root address and target pattern are validated before any network
/// activity: a root that does not resolve to an absolute address is
/// [`crate::CrawlError::BadStartingAddress`], a pattern that does not compile
/// is [`crate::CrawlError::InvalidPattern`].
pub struct CrawlConfig {
    /// Seed address the crawl starts from. A missing scheme is tolerated and
    /// defaults to `http`.
    pub root_address: String,

    /// Regex whose `target` named capture group yields the data to extract.
    pub target_pattern: String,

    /// Explicit user-agent rotation list; `None` keeps the built-in list.
    pub user_agents: Option<Vec<String>>,

    /// Proxy addresses to build transports from. Each is validated before
    /// entering the pool.
    pub proxy_addresses: Vec<String>,

    /// Whether to also send requests through the host's own connection.
    pub use_host_transport: bool,

    /// Maximum link-follow depth; 0 crawls only the root page.
    pub max_depth: u32,

    /// Discard links whose host differs from the page they were found on.
    pub stay_on_domain: bool,

    /// Opt-in deduplication of visited addresses. Off by default: without it
    /// a cyclic link graph is crawled repeatedly until `max_depth` truncates
    /// it.
    pub dedup_links: bool,

    /// Where extracted `(source, match)` pairs go.
    pub sink: Box<dyn ResultSink>,

    /// Overridable link-discovery function; `None` uses the anchor-href
    /// extractor.
    pub link_discovery: Option<LinkDiscovery>,

    /// Alternate fetch backend. When set, the client pool is never built and
    /// the proxy/user-agent/host-transport settings above are ignored. This
    /// is the injection point for a scripted-rendering backend.
    pub fetcher: Option<Arc<dyn FetchCapability>>,

    /// Probe endpoints and timeouts for the client pool.
    pub pool_settings: PoolSettings,
}

impl CrawlConfig {
    /// Creates a configuration with defaults: host transport enabled, no
    /// proxies, depth 0, no domain restriction, no deduplication.
    pub fn new(
        root_address: impl Into<String>,
        target_pattern: impl Into<String>,
        sink: Box<dyn ResultSink>,
    ) -> Self {
        Self {
            root_address: root_address.into(),
            target_pattern: target_pattern.into(),
            user_agents: None,
            proxy_addresses: Vec::new(),
            use_host_transport: true,
            max_depth: 0,
            stay_on_domain: false,
            dedup_links: false,
            sink,
            link_discovery: None,
            fetcher: None,
            pool_settings: PoolSettings::default(),
        }
    }
}
