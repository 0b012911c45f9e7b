//! Network transport management
//!
//! This module owns everything that talks HTTP on behalf of the crawl:
//! - The [`FetchCapability`] trait the engine fetches pages through
//! - The [`ClientPool`]: a set of validated transports (direct and proxied)
//!   with random per-request transport and user-agent selection
//! - Connectivity and proxy-validation probes

mod pool;
mod probe;

pub use pool::ClientPool;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while configuring the client pool. Both variants are fatal
/// and pre-flight: they abort the crawl before any page is fetched.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no internet connection: baseline connectivity probe failed")]
    NoConnection,

    #[error("no working transports: every proxy failed validation and no host transport was available")]
    NoWorkingTransports,

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// A capability that fetches a page body for an absolute address.
///
/// Ordinary HTTP failures (timeouts, non-2xx responses, transport faults)
/// must never propagate out of `fetch`: a single dead page must not abort the
/// crawl, so implementors log the failure and return an empty body.
/// [`ClientPool`] is the direct-HTTP implementor; a scripted-rendering
/// backend can be injected through [`crate::CrawlConfig::fetcher`] instead.
#[async_trait]
pub trait FetchCapability: Send + Sync {
    /// Fetches the page at `address`, returning its body, or an empty string
    /// on any per-request failure.
    async fn fetch(&self, address: &Url) -> String;
}

/// Probe endpoints and timeouts used by [`ClientPool`].
///
/// The defaults point at public endpoints; tests swap in a local mock server.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Address fetched to confirm baseline internet connectivity.
    pub connectivity_probe: String,

    /// IP-echo endpoint returning `{"ip": "..."}`, used to confirm a proxy is
    /// actually forwarding traffic.
    pub ip_echo_probe: String,

    /// Per-request timeout applied to every transport in the pool.
    pub request_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            connectivity_probe: "https://www.google.com/".to_string(),
            ip_echo_probe: "https://api.ipify.org/?format=json".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}
