//! The `Replica` data model — one running backend instance registered
//! under a logical service name.

use serde::{Deserialize, Serialize};
use url::Url;

/// A single registered backend instance.
///
/// # Invariants
///
/// - `endpoint` is a parseable absolute URL (scheme + host + port).
/// - `weight` is at least 1.
/// - `service` is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Replica {
    /// Logical service name this replica answers for.
    pub service: String,
    /// Human-readable label for this replica (the registering project name).
    pub name: String,
    /// Absolute endpoint URL: scheme + host + port.
    pub endpoint: String,
    /// Weight for weighted load balancing. Default 1.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Whether the last health probe considered this replica reachable.
    #[serde(default = "default_healthy")]
    pub healthy: bool,
    /// Path probed by the Health Checker, overriding the default `/health`.
    #[serde(default, rename = "healthPath", skip_serializing_if = "Option::is_none")]
    pub health_path: Option<String>,
}

fn default_weight() -> u32 {
    1
}

fn default_healthy() -> bool {
    // Newly registered replicas are assumed healthy until the health
    // checker's next sweep proves otherwise; this matches the admin
    // handler contract of making a registration immediately eligible
    // for dispatch rather than waiting out the first probe interval.
    true
}

impl Replica {
    pub fn new(service: impl Into<String>, name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
            endpoint: endpoint.into(),
            weight: default_weight(),
            healthy: default_healthy(),
            health_path: None,
        }
    }

    /// The path the Health Checker probes for this replica: the
    /// registration-supplied override, or `/health` by default.
    pub fn health_path(&self) -> &str {
        self.health_path.as_deref().unwrap_or("/health")
    }

    /// Validates that `endpoint` is a well-formed absolute URL with a host.
    ///
    /// A malformed endpoint must be rejected at registration time rather
    /// than silently substituted with a fallback target.
    pub fn validate_endpoint(endpoint: &str) -> Result<Url, String> {
        let url = Url::parse(endpoint).map_err(|e| format!("invalid endpoint url: {e}"))?;
        if url.host_str().is_none() {
            return Err("endpoint url is missing a host".to_string());
        }
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!("unsupported endpoint scheme: {}", url.scheme()));
        }
        Ok(url)
    }

    /// Identifies this replica for deregistration matching: same service,
    /// same endpoint, same label.
    pub fn matches(&self, service: &str, endpoint: &str) -> bool {
        self.service == service && self.endpoint == endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_path_defaults_when_unset() {
        let replica = Replica::new("svc", "p1", "http://127.0.0.1:9001");
        assert_eq!(replica.health_path(), "/health");
    }

    #[test]
    fn health_path_uses_registration_override() {
        let mut replica = Replica::new("svc", "p1", "http://127.0.0.1:9001");
        replica.health_path = Some("/ready".to_string());
        assert_eq!(replica.health_path(), "/ready");
    }

    #[test]
    fn validate_endpoint_rejects_non_http_scheme() {
        assert!(Replica::validate_endpoint("ftp://example.com").is_err());
    }
}
