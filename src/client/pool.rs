//! Client pool with transport and user-agent rotation

use super::probe::{check_connection, validate_proxy};
use super::{FetchCapability, PoolError, PoolSettings};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Proxy};
use std::sync::{Arc, RwLock};
use url::Url;

/// Default user-agent rotation list.
const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/116.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13.5; rv:109.0) Gecko/20100101 Firefox/116.0",
    "Mozilla/5.0 (X11; Linux i686; rv:109.0) Gecko/20100101 Firefox/116.0",
];

/// One usable transport: an HTTP client, plus the proxy address it routes
/// through for proxied entries.
struct Transport {
    client: Client,
    proxy: Option<String>,
}

/// A pool of validated network transports with random per-request selection.
///
/// The pool holds one client per working proxy plus, when requested, one
/// direct client routed through the host's own connection. Every `fetch`
/// picks one transport and one user agent uniformly at random.
///
/// Both the transport list and the user-agent list are published as immutable
/// snapshots behind locks, so [`configure`](ClientPool::configure) and
/// [`change_user_agents`](ClientPool::change_user_agents) may run concurrently
/// with in-flight fetches without readers ever observing a torn list.
pub struct ClientPool {
    transports: RwLock<Arc<Vec<Transport>>>,
    user_agents: RwLock<Arc<Vec<String>>>,
    settings: PoolSettings,
}

impl ClientPool {
    /// Creates an empty pool with default probe settings. The pool is not
    /// usable until [`configure`](ClientPool::configure) succeeds.
    pub fn new() -> Self {
        Self::with_settings(PoolSettings::default())
    }

    /// Creates an empty pool with explicit probe settings.
    pub fn with_settings(settings: PoolSettings) -> Self {
        let agents = DEFAULT_USER_AGENTS
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();

        Self {
            transports: RwLock::new(Arc::new(Vec::new())),
            user_agents: RwLock::new(Arc::new(agents)),
            settings,
        }
    }

    /// Rebuilds the transport pool from a set of proxy addresses.
    ///
    /// A baseline connectivity probe runs first; failure is
    /// [`PoolError::NoConnection`]. Every supplied proxy is then validated
    /// concurrently against the IP-echo probe and only the survivors enter
    /// the pool, in no particular order. The direct host transport is
    /// appended only when `use_host_transport` is set; the connectivity probe
    /// doubles as its validation. An entirely empty result is
    /// [`PoolError::NoWorkingTransports`].
    ///
    /// Returns the number of usable transports. Safe to call again at any
    /// time, including while fetches are in flight.
    pub async fn configure(
        &self,
        proxy_addresses: &[String],
        use_host_transport: bool,
    ) -> Result<usize, PoolError> {
        let direct = self.build_client(None)?;

        if !check_connection(&direct, &self.settings.connectivity_probe).await {
            return Err(PoolError::NoConnection);
        }

        let probes = proxy_addresses
            .iter()
            .map(|address| self.probe_proxy(address));
        let validated = futures::future::join_all(probes).await;

        let mut transports: Vec<Transport> = validated.into_iter().flatten().collect();

        if use_host_transport {
            transports.push(Transport {
                client: direct,
                proxy: None,
            });
        }

        if transports.is_empty() {
            return Err(PoolError::NoWorkingTransports);
        }

        tracing::info!(
            "Client pool configured with {} transport(s) ({} proxied)",
            transports.len(),
            transports.iter().filter(|t| t.proxy.is_some()).count()
        );

        let count = transports.len();
        *self.transports.write().unwrap() = Arc::new(transports);
        Ok(count)
    }

    /// Replaces the user-agent rotation list. An empty replacement list is
    /// ignored with a warning so the pool always has an agent to send.
    pub fn change_user_agents(&self, new_agents: Vec<String>) {
        if new_agents.is_empty() {
            tracing::warn!("Ignoring empty user-agent list");
            return;
        }
        *self.user_agents.write().unwrap() = Arc::new(new_agents);
    }

    /// Number of transports currently in the pool.
    pub fn transport_count(&self) -> usize {
        self.transports.read().unwrap().len()
    }

    /// Proxy addresses of the transports currently in the pool, for
    /// inspection; the direct transport contributes no entry.
    pub fn proxy_addresses(&self) -> Vec<String> {
        self.transports
            .read()
            .unwrap()
            .iter()
            .filter_map(|t| t.proxy.clone())
            .collect()
    }

    /// Builds one transport client, optionally routed through a proxy.
    fn build_client(&self, proxy_address: Option<&str>) -> Result<Client, PoolError> {
        let mut builder = Client::builder()
            .timeout(self.settings.request_timeout)
            .gzip(true)
            .brotli(true);

        if let Some(address) = proxy_address {
            builder = builder.proxy(Proxy::all(address)?);
        }

        Ok(builder.build()?)
    }

    /// Builds and validates one proxied transport, yielding `None` when the
    /// proxy cannot be built or fails the IP-echo check.
    async fn probe_proxy(&self, proxy_address: &str) -> Option<Transport> {
        let client = match self.build_client(Some(proxy_address)) {
            Ok(client) => client,
            Err(e) => {
                tracing::debug!("Could not build client for proxy {}: {}", proxy_address, e);
                return None;
            }
        };

        if validate_proxy(&client, proxy_address, &self.settings.ip_echo_probe).await {
            tracing::debug!("Proxy {} validated", proxy_address);
            Some(Transport {
                client,
                proxy: Some(proxy_address.to_string()),
            })
        } else {
            tracing::warn!("Proxy {} failed validation, dropping it", proxy_address);
            None
        }
    }

    /// Picks one transport and one user agent uniformly at random from the
    /// current snapshots. `None` when the pool was never configured.
    fn pick(&self) -> Option<(Client, String)> {
        let transports = Arc::clone(&self.transports.read().unwrap());
        let agents = Arc::clone(&self.user_agents.read().unwrap());
        if transports.is_empty() || agents.is_empty() {
            return None;
        }

        let mut rng = rand::thread_rng();
        let transport = &transports[rng.gen_range(0..transports.len())];
        let agent = agents[rng.gen_range(0..agents.len())].clone();
        Some((transport.client.clone(), agent))
    }
}

impl Default for ClientPool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchCapability for ClientPool {
    /// Fetches a page through a randomly selected transport.
    ///
    /// Request failures of any kind (non-2xx status, timeout, transport
    /// fault) are logged and yield an empty body; a single dead page must
    /// not abort the crawl. There is no retry: one attempt per fetch.
    async fn fetch(&self, address: &Url) -> String {
        let Some((client, agent)) = self.pick() else {
            tracing::warn!("Fetch of {} attempted before the pool was configured", address);
            return String::new();
        };

        let response = match client
            .get(address.clone())
            .header(USER_AGENT, agent)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Request to {} failed: {}", address, e);
                return String::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!("Request to {} returned HTTP {}", address, response.status());
            return String::new();
        }

        match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to read body from {}: {}", address, e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pool_is_empty() {
        let pool = ClientPool::new();
        assert_eq!(pool.transport_count(), 0);
        assert!(pool.pick().is_none());
    }

    #[test]
    fn test_default_user_agents_present() {
        let pool = ClientPool::new();
        assert_eq!(pool.user_agents.read().unwrap().len(), 3);
    }

    #[test]
    fn test_empty_user_agent_list_is_ignored() {
        let pool = ClientPool::new();
        pool.change_user_agents(Vec::new());
        assert_eq!(pool.user_agents.read().unwrap().len(), 3);
    }

    #[test]
    fn test_change_user_agents_swaps_snapshot() {
        let pool = ClientPool::new();
        pool.change_user_agents(vec!["TestAgent/1.0".to_string()]);
        let agents = pool.user_agents.read().unwrap();
        assert_eq!(agents.as_slice(), ["TestAgent/1.0".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_on_unconfigured_pool_returns_empty() {
        let pool = ClientPool::new();
        let address = Url::parse("http://example.com/").unwrap();
        assert_eq!(pool.fetch(&address).await, "");
    }
}
