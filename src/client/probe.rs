//! Connectivity and proxy-validation probes

use reqwest::Client;
use serde::Deserialize;
use url::Url;

/// Body returned by the IP-echo endpoint.
#[derive(Debug, Deserialize)]
struct IpEcho {
    ip: String,
}

/// Checks whether `client` can reach the internet at all by fetching the
/// configured probe address.
pub(super) async fn check_connection(client: &Client, probe_address: &str) -> bool {
    match client.get(probe_address).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            tracing::debug!("Connectivity probe failed: {}", e);
            false
        }
    }
}

/// Validates that a proxied client is actually forwarding traffic.
///
/// The client fetches the IP-echo endpoint through the proxy; the echoed IP
/// must match one of the DNS-resolved addresses of the proxy's own host.
/// Any failure along the way (unreachable proxy, malformed echo body,
/// unresolvable proxy host, IP mismatch) rejects the proxy.
pub(super) async fn validate_proxy(client: &Client, proxy_address: &str, echo_address: &str) -> bool {
    let echoed_ip = match client.get(echo_address).send().await {
        Ok(response) => match response.json::<IpEcho>().await {
            Ok(echo) => echo.ip,
            Err(e) => {
                tracing::debug!("Proxy {} returned a malformed IP echo: {}", proxy_address, e);
                return false;
            }
        },
        Err(e) => {
            tracing::debug!("Proxy {} failed the IP-echo probe: {}", proxy_address, e);
            return false;
        }
    };

    let Some(host) = proxy_host(proxy_address) else {
        tracing::debug!("Proxy address {} has no resolvable host", proxy_address);
        return false;
    };

    // Port is irrelevant for the lookup; 80 keeps lookup_host happy.
    let lookup = tokio::net::lookup_host((host.as_str(), 80)).await;
    match lookup {
        Ok(addrs) => {
            for addr in addrs {
                if addr.ip().to_string() == echoed_ip {
                    return true;
                }
            }
            tracing::debug!(
                "Proxy {} echoed {} which matches none of its resolved addresses",
                proxy_address,
                echoed_ip
            );
            false
        }
        Err(e) => {
            tracing::debug!("Failed to resolve proxy host {}: {}", host, e);
            false
        }
    }
}

/// Extracts the host component of a proxy address, tolerating addresses given
/// without a scheme (`host:port`).
fn proxy_host(proxy_address: &str) -> Option<String> {
    let parsed = Url::parse(proxy_address)
        .ok()
        .filter(|u| u.host_str().is_some())
        .or_else(|| Url::parse(&format!("http://{proxy_address}")).ok())?;
    parsed.host_str().map(|h| h.to_string())
}
