//! Outbound HTTP client pool: one keep-alive `reqwest::Client` per origin,
//! created lazily and retained for the process lifetime.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use reqwest::Client;
use tokio::sync::RwLock;
use url::Url;

const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_IDLE_PER_HOST: usize = 20;

/// Cache of per-origin HTTP clients.
///
/// Reads are the common case (one per dispatch); writes happen only on the
/// first request to a previously unseen origin, so a `RwLock` over the map
/// keeps reads lock-free of each other.
pub struct ClientPool {
    clients: RwLock<HashMap<String, Client>>,
    /// Connect timeout and overall per-request deadline for every pooled
    /// client, sourced from `Settings.outbound_timeout`
    /// (`KAIROS_GATEWAY_TIMEOUT_SECS`).
    timeout: Duration,
}

impl ClientPool {
    pub fn new(timeout: Duration) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    fn origin_key(endpoint: &str) -> Result<String, String> {
        let url = Url::parse(endpoint).map_err(|e| format!("invalid endpoint url: {e}"))?;
        let host = url.host_str().ok_or_else(|| "endpoint url is missing a host".to_string())?;
        Ok(match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        })
    }

    /// Returns the pooled client for `endpoint`'s origin, building and
    /// caching a new one on first use.
    pub async fn client_for(&self, endpoint: &str) -> Result<Client, String> {
        let key = Self::origin_key(endpoint)?;

        if let Some(client) = self.clients.read().await.get(&key) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        debug!("building pooled client for origin {key}");
        let client = Client::builder()
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .tcp_keepalive(IDLE_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to build http client: {e}"))?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_origin_reuses_the_same_client_entry() {
        let pool = ClientPool::new(Duration::from_secs(50));
        let a = pool.client_for("http://127.0.0.1:9001/foo").await.unwrap();
        let b = pool.client_for("http://127.0.0.1:9001/bar").await.unwrap();
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
    }

    #[tokio::test]
    async fn malformed_endpoint_is_rejected() {
        let pool = ClientPool::new(Duration::from_secs(50));
        assert!(pool.client_for("not a url").await.is_err());
    }
}
