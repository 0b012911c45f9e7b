//! Crawler module - the crawl engine and its entry point
//!
//! The engine fans out one task per page, funnels every extracted result
//! through a single hand-off channel into the sink, and detects completion
//! across the dynamically growing task tree.

mod engine;

use crate::config::CrawlConfig;
use crate::Result;

/// Runs a complete crawl operation.
///
/// This is the single entry point of the engine. It validates the
/// configuration, builds the client pool (unless an alternate fetch backend
/// was injected), processes the root page and everything reachable from it
/// within the configured depth, and streams extracted `(source, match)`
/// pairs into the sink. The sink is closed exactly once, also when the crawl
/// aborts on a fatal pre-flight error.
///
/// # Errors
///
/// Only pre-flight failures are returned:
/// [`CrawlError::BadStartingAddress`], [`CrawlError::InvalidPattern`] and the
/// pool configuration errors wrapped in [`CrawlError::Pool`]. Per-page
/// runtime faults never abort the crawl.
///
/// [`CrawlError::BadStartingAddress`]: crate::CrawlError::BadStartingAddress
/// [`CrawlError::InvalidPattern`]: crate::CrawlError::InvalidPattern
/// [`CrawlError::Pool`]: crate::CrawlError::Pool
pub async fn crawl(config: CrawlConfig) -> Result<()> {
    engine::run(config).await
}
