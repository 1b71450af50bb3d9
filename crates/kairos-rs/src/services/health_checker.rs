//! Background health checker: periodically probes every registered
//! replica and feeds the result into the Registry's healthy flags and each
//! service's circuit breaker.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;
use tokio::time::interval;

use crate::services::registry::Registry;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HealthChecker {
    registry: Arc<Registry>,
    client: Client,
    interval: Duration,
}

impl HealthChecker {
    pub fn new(registry: Arc<Registry>, interval: Duration) -> Self {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .expect("health checker http client");
        Self {
            registry,
            client,
            interval,
        }
    }

    /// Spawns the periodic sweep as an independent task, decoupled from the
    /// request-serving path.
    pub fn spawn(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval);
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        });
    }

    async fn sweep(&self) {
        for service in self.registry.service_names().await {
            let replicas = self.registry.all(&service).await;
            let breaker = self.registry.breaker_for(&service).await;
            for replica in replicas {
                let healthy = self.probe(&replica.endpoint, replica.health_path()).await;
                self.registry.set_healthy(&service, &replica.endpoint, healthy).await;
                breaker.record(healthy).await;
            }
        }
    }

    /// Issues a real HTTP GET to `path` on the replica (the registration's
    /// `healthPath` override, or `/health` by default). Any error (connect
    /// failure, timeout, non-2xx) is treated as a probe failure, logged, and
    /// never propagated — the checker must not crash.
    async fn probe(&self, endpoint: &str, path: &str) -> bool {
        let url = format!("{}{}", endpoint.trim_end_matches('/'), path);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("probe ok: {url}");
                true
            }
            Ok(response) => {
                warn!("probe returned {} for {url}", response.status());
                false
            }
            Err(e) => {
                warn!("probe failed for {url}: {e}");
                false
            }
        }
    }
}
