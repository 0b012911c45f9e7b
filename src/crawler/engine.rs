//! Crawl engine - fan-out, termination detection and result hand-off
//!
//! Every page is one crawl unit: fetch, extract matches, expand links,
//! schedule children. Units run as independent tasks with no central
//! scheduler; the only coordination points are the result channel feeding the
//! consumer task and the producer handles that double as the outstanding-work
//! accounting.
//!
//! Termination works by handle ownership instead of a hand-rolled counter:
//! every unit owns one clone of the channel's producer handle, and every
//! child receives its clone strictly before the parent unit releases its own.
//! The channel therefore completes exactly once, when the last unit in the
//! tree finishes, and can never complete while a child is still about to be
//! scheduled.

use crate::client::{ClientPool, FetchCapability};
use crate::config::{CrawlConfig, LinkDiscovery};
use crate::sink::ResultSink;
use crate::{extract, resolver, CrawlError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use url::Url;

/// One in-flight page: the resolved address to fetch and its distance from
/// the root. Never mutated; descending to a link produces a new node.
struct CrawlNode {
    address: Url,
    depth: u32,
}

impl CrawlNode {
    fn descend(&self, address: Url) -> Self {
        Self {
            address,
            depth: self.depth + 1,
        }
    }
}

/// Settings shared by every crawl unit, inherited unchanged from the root
/// configuration. The compiled pattern is built once and shared.
struct EngineCtx {
    pattern: Regex,
    fetcher: Arc<dyn FetchCapability>,
    link_discovery: LinkDiscovery,
    max_depth: u32,
    stay_on_domain: bool,
    /// Present only when deduplication was requested.
    visited: Option<Mutex<HashSet<String>>>,
    pages_fetched: AtomicU64,
}

/// Producer side of the result hand-off channel. One clone per live unit.
type ResultTx = mpsc::UnboundedSender<(String, String)>;

/// Runs a crawl to completion.
///
/// Pre-flight validation happens in order: target pattern compilation, root
/// address resolution, client pool configuration. Any of these failing aborts
/// the crawl before a single page is fetched, with the sink closed
/// best-effort. Once units start, no per-page fault can abort the crawl.
pub(super) async fn run(config: CrawlConfig) -> Result<()> {
    let CrawlConfig {
        root_address,
        target_pattern,
        user_agents,
        proxy_addresses,
        use_host_transport,
        max_depth,
        stay_on_domain,
        dedup_links,
        mut sink,
        link_discovery,
        fetcher,
        pool_settings,
    } = config;

    let pattern = match extract::compile(&target_pattern) {
        Ok(pattern) => pattern,
        Err(e) => {
            close_sink(&mut sink);
            return Err(e);
        }
    };

    let Some(root) = resolver::resolve_root(&root_address) else {
        close_sink(&mut sink);
        return Err(CrawlError::BadStartingAddress(root_address));
    };

    let fetcher: Arc<dyn FetchCapability> = match fetcher {
        Some(fetcher) => fetcher,
        None => {
            let pool = ClientPool::with_settings(pool_settings);
            if let Some(agents) = user_agents {
                pool.change_user_agents(agents);
            }
            match pool.configure(&proxy_addresses, use_host_transport).await {
                Ok(_) => Arc::new(pool),
                Err(e) => {
                    close_sink(&mut sink);
                    return Err(e.into());
                }
            }
        }
    };

    let link_discovery: LinkDiscovery =
        link_discovery.unwrap_or_else(|| Arc::new(|text: &str| extract::find_links(text)));

    let ctx = Arc::new(EngineCtx {
        pattern,
        fetcher,
        link_discovery,
        max_depth,
        stay_on_domain,
        visited: dedup_links.then(|| Mutex::new(HashSet::new())),
        pages_fetched: AtomicU64::new(0),
    });

    let (results, mut queue) = mpsc::unbounded_channel::<(String, String)>();

    // Single consumer: drains the queue in arrival order, then releases the
    // sink. The sink is closed here and nowhere else once units have started.
    let consumer = tokio::spawn(async move {
        while let Some((source, content)) = queue.recv().await {
            if let Err(e) = sink.write(&source, &content) {
                tracing::warn!("Sink write failed for {}: {}", source, e);
            }
        }
        sink.close()
    });

    tracing::info!("Starting crawl at {} (max depth {})", root, max_depth);

    if let Some(visited) = &ctx.visited {
        visited.lock().unwrap().insert(root.to_string());
    }

    let root_node = CrawlNode {
        address: root,
        depth: 0,
    };
    // `results` moves into the root unit; from here on the channel stays open
    // exactly as long as some unit is still alive.
    spawn_unit(Arc::clone(&ctx), root_node, results);

    match consumer.await {
        Ok(close_result) => close_result?,
        Err(e) => tracing::error!("Result consumer task failed: {}", e),
    }

    tracing::info!(
        "Crawl finished: {} page(s) fetched",
        ctx.pages_fetched.load(Ordering::Relaxed)
    );

    Ok(())
}

/// Schedules one crawl unit as its own task. The unit's producer handle is
/// handed over before the task starts, so the work is accounted for from the
/// moment of scheduling.
fn spawn_unit(ctx: Arc<EngineCtx>, node: CrawlNode, results: ResultTx) {
    tokio::spawn(process(ctx, node, results));
}

/// One fetch-extract-expand cycle.
///
/// A fetch failure yields an empty page and the unit carries on with no
/// matches and no links; nothing a single page does can abort sibling or
/// ancestor work. Matches are enqueued before links are expanded, in match
/// order.
async fn process(ctx: Arc<EngineCtx>, node: CrawlNode, results: ResultTx) {
    tracing::debug!("Processing {} at depth {}", node.address, node.depth);

    let page = ctx.fetcher.fetch(&node.address).await;
    ctx.pages_fetched.fetch_add(1, Ordering::Relaxed);

    let source = node.address.to_string();
    for matched in extract::find_all(&page, &ctx.pattern) {
        // Send only fails when the consumer is gone, which means the crawl
        // is already tearing down.
        let _ = results.send((source.clone(), matched));
    }

    if node.depth < ctx.max_depth {
        for raw_link in (ctx.link_discovery)(&page) {
            let Some(address) = resolver::resolve(&raw_link, &node.address) else {
                // Unusable link, not an error.
                continue;
            };

            if ctx.stay_on_domain && !resolver::same_host(&address, &node.address) {
                tracing::debug!("Skipping off-domain link {}", address);
                continue;
            }

            if let Some(visited) = &ctx.visited {
                if !visited.lock().unwrap().insert(address.to_string()) {
                    continue;
                }
            }

            // The child's producer handle is cloned before this unit's own
            // handle drops: the channel cannot complete while children are
            // still about to be scheduled.
            spawn_unit(Arc::clone(&ctx), node.descend(address), results.clone());
        }
    }

    // `results` drops here: this unit is finished.
}

fn close_sink(sink: &mut Box<dyn ResultSink>) {
    if let Err(e) = sink.close() {
        tracing::warn!("Failed to close sink: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{SinkError, SinkResult};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    /// Fetch stub backed by a static page map; records every fetched address.
    struct PageMap {
        pages: HashMap<String, String>,
        fetched: Mutex<Vec<String>>,
    }

    impl PageMap {
        fn new(pages: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(a, b)| (a.to_string(), b.to_string()))
                    .collect(),
                fetched: Mutex::new(Vec::new()),
            })
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FetchCapability for PageMap {
        async fn fetch(&self, address: &Url) -> String {
            self.fetched.lock().unwrap().push(address.to_string());
            self.pages.get(address.as_str()).cloned().unwrap_or_default()
        }
    }

    /// Sink recording writes and counting close calls.
    struct RecordingSink {
        writes: Arc<Mutex<Vec<(String, String)>>>,
        closes: Arc<AtomicUsize>,
    }

    impl RecordingSink {
        #[allow(clippy::type_complexity)]
        fn new() -> (Box<Self>, Arc<Mutex<Vec<(String, String)>>>, Arc<AtomicUsize>) {
            let writes = Arc::new(Mutex::new(Vec::new()));
            let closes = Arc::new(AtomicUsize::new(0));
            let sink = Box::new(Self {
                writes: Arc::clone(&writes),
                closes: Arc::clone(&closes),
            });
            (sink, writes, closes)
        }
    }

    impl ResultSink for RecordingSink {
        fn write(&mut self, source: &str, content: &str) -> SinkResult<()> {
            self.writes
                .lock()
                .unwrap()
                .push((source.to_string(), content.to_string()));
            Ok(())
        }

        fn close(&mut self) -> SinkResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config_with(
        root: &str,
        pattern: &str,
        fetcher: Arc<dyn FetchCapability>,
        sink: Box<dyn ResultSink>,
    ) -> CrawlConfig {
        let mut config = CrawlConfig::new(root, pattern, sink);
        config.fetcher = Some(fetcher);
        config
    }

    #[tokio::test]
    async fn test_single_page_depth_zero() {
        let fetcher = PageMap::new(&[(
            "http://localhost/",
            r#"spyware here, <a href="/next">next</a>, more spyware"#,
        )]);
        let (sink, writes, closes) = RecordingSink::new();

        let config = config_with(
            "http://localhost/",
            r"(?P<target>spyware)",
            fetcher.clone(),
            sink,
        );
        crate::crawler::crawl(config).await.unwrap();

        // Only the matches from the single page, and no other fetch.
        assert_eq!(
            writes.lock().unwrap().as_slice(),
            [
                ("http://localhost/".to_string(), "spyware".to_string()),
                ("http://localhost/".to_string(), "spyware".to_string()),
            ]
        );
        assert_eq!(fetcher.fetched(), ["http://localhost/"]);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_page_terminates_with_no_writes() {
        let fetcher = PageMap::new(&[("http://localhost/", "")]);
        let (sink, writes, closes) = RecordingSink::new();

        let mut config = config_with("http://localhost/", r"(?P<target>x)", fetcher, sink);
        config.max_depth = 5;
        crate::crawler::crawl(config).await.unwrap();

        assert!(writes.lock().unwrap().is_empty());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_links_followed_to_max_depth() {
        let fetcher = PageMap::new(&[
            (
                "http://localhost/",
                r#"id=root <a href="/a">a</a> <a href="/b">b</a>"#,
            ),
            ("http://localhost/a", r#"id=a <a href="/c">c</a>"#),
            ("http://localhost/b", "id=b"),
            ("http://localhost/c", "id=c"),
        ]);
        let (sink, writes, closes) = RecordingSink::new();

        let mut config = config_with(
            "http://localhost/",
            r"id=(?P<target>\w+)",
            fetcher.clone(),
            sink,
        );
        config.max_depth = 1;
        crate::crawler::crawl(config).await.unwrap();

        // Depth 1 reaches /a and /b but never /c.
        let mut fetched = fetcher.fetched();
        fetched.sort();
        assert_eq!(
            fetched,
            ["http://localhost/", "http://localhost/a", "http://localhost/b"]
        );

        let mut contents: Vec<String> = writes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.clone())
            .collect();
        contents.sort();
        assert_eq!(contents, ["a", "b", "root"]);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_self_link_is_fetched_once_per_depth() {
        // No deduplication: a page linking to itself is fetched at depth 0,
        // 1 and 2 before max_depth truncates the cycle.
        let fetcher = PageMap::new(&[(
            "http://localhost/",
            r#"<a href="http://localhost/">loop</a>"#,
        )]);
        let (sink, _writes, _closes) = RecordingSink::new();

        let mut config = config_with("http://localhost/", r"(?P<target>never)", fetcher.clone(), sink);
        config.max_depth = 2;
        crate::crawler::crawl(config).await.unwrap();

        assert_eq!(fetcher.fetched().len(), 3);
    }

    #[tokio::test]
    async fn test_dedup_breaks_the_cycle() {
        let fetcher = PageMap::new(&[(
            "http://localhost/",
            r#"<a href="http://localhost/">loop</a>"#,
        )]);
        let (sink, _writes, _closes) = RecordingSink::new();

        let mut config = config_with("http://localhost/", r"(?P<target>never)", fetcher.clone(), sink);
        config.max_depth = 2;
        config.dedup_links = true;
        crate::crawler::crawl(config).await.unwrap();

        assert_eq!(fetcher.fetched().len(), 1);
    }

    #[tokio::test]
    async fn test_stay_on_domain_discards_external_links() {
        let fetcher = PageMap::new(&[
            (
                "http://localhost/",
                r#"<a href="http://elsewhere/x">out</a> <a href="/in">in</a>"#,
            ),
            ("http://localhost/in", ""),
            ("http://elsewhere/x", ""),
        ]);
        let (sink, _writes, _closes) = RecordingSink::new();

        let mut config = config_with("http://localhost/", r"(?P<target>never)", fetcher.clone(), sink);
        config.max_depth = 1;
        config.stay_on_domain = true;
        crate::crawler::crawl(config).await.unwrap();

        let mut fetched = fetcher.fetched();
        fetched.sort();
        assert_eq!(fetched, ["http://localhost/", "http://localhost/in"]);
    }

    #[tokio::test]
    async fn test_unresolvable_links_are_discarded_silently() {
        let fetcher = PageMap::new(&[("http://localhost/", r#"<a href="">empty</a>"#)]);
        let (sink, _writes, closes) = RecordingSink::new();

        let mut config = config_with("http://localhost/", r"(?P<target>never)", fetcher.clone(), sink);
        config.max_depth = 3;
        crate::crawler::crawl(config).await.unwrap();

        assert_eq!(fetcher.fetched().len(), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bad_root_address_fails_preflight() {
        let fetcher = PageMap::new(&[]);
        let (sink, writes, closes) = RecordingSink::new();

        let config = config_with("///", r"(?P<target>x)", fetcher.clone(), sink);
        let err = crate::crawler::crawl(config).await.unwrap_err();

        assert!(matches!(err, CrawlError::BadStartingAddress(_)));
        assert!(fetcher.fetched().is_empty());
        assert!(writes.lock().unwrap().is_empty());
        // Sink still released exactly once on the abort path.
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_pattern_fails_preflight() {
        let fetcher = PageMap::new(&[]);
        let (sink, _writes, closes) = RecordingSink::new();

        let config = config_with("http://localhost/", "(?P<target>[", fetcher.clone(), sink);
        let err = crate::crawler::crawl(config).await.unwrap_err();

        assert!(matches!(err, CrawlError::InvalidPattern(_)));
        assert!(fetcher.fetched().is_empty());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_link_discovery() {
        let fetcher = PageMap::new(&[
            ("http://localhost/", "follow: /custom"),
            ("http://localhost/custom", "id=found"),
        ]);
        let (sink, writes, _closes) = RecordingSink::new();

        let mut config = config_with(
            "http://localhost/",
            r"id=(?P<target>\w+)",
            fetcher,
            sink,
        );
        config.max_depth = 1;
        config.link_discovery = Some(Arc::new(|text: &str| {
            text.strip_prefix("follow: ")
                .map(|rest| vec![rest.to_string()])
                .unwrap_or_default()
        }));
        crate::crawler::crawl(config).await.unwrap();

        assert_eq!(
            writes.lock().unwrap().as_slice(),
            [("http://localhost/custom".to_string(), "found".to_string())]
        );
    }

    #[tokio::test]
    async fn test_sink_write_error_does_not_abort_crawl() {
        struct FailingSink {
            closes: Arc<AtomicUsize>,
        }

        impl ResultSink for FailingSink {
            fn write(&mut self, _source: &str, _content: &str) -> SinkResult<()> {
                Err(SinkError::Write("disk full".to_string()))
            }
            fn close(&mut self) -> SinkResult<()> {
                self.closes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let fetcher = PageMap::new(&[("http://localhost/", "id=x id=y")]);
        let closes = Arc::new(AtomicUsize::new(0));
        let sink = Box::new(FailingSink {
            closes: Arc::clone(&closes),
        });

        let config = config_with("http://localhost/", r"id=(?P<target>\w+)", fetcher, sink);
        crate::crawler::crawl(config).await.unwrap();

        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
