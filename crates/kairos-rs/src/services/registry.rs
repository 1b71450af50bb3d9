//! Runtime service registry: the authoritative in-memory map from logical
//! service name to its registered replicas.
//!
//! Unlike the static, config-file-driven topology this crate once loaded at
//! startup, the registry here is mutated at runtime by the admin handlers and
//! read on every proxied request and every health-check sweep.

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use tokio::sync::RwLock;

use crate::models::replica::Replica;
use crate::services::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};

/// Snapshot of one service's replicas, as returned by `Registry::snapshot`.
#[derive(Debug, Clone)]
pub struct ServiceSnapshot {
    pub total: usize,
    pub healthy: usize,
    pub endpoints: Vec<String>,
}

/// Owns every registered replica and the one circuit breaker per service.
///
/// Reads (`healthy`, `snapshot`) take a shared lock; writes (`register`,
/// `deregister`) take an exclusive one. Both are short-held — no I/O happens
/// while either lock is held.
pub struct Registry {
    services: RwLock<HashMap<String, Vec<Replica>>>,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Appends `replica` to `service`'s sequence, creating both the sequence
    /// and its circuit breaker if this is the first replica seen for it.
    ///
    /// Duplicate `(service, endpoint)` pairs are permitted; each is scheduled
    /// independently by the load balancer.
    pub async fn register(&self, service: &str, replica: Replica) {
        {
            let mut breakers = self.breakers.write().await;
            breakers
                .entry(service.to_string())
                .or_insert_with(|| CircuitBreaker::new(service.to_string(), CircuitBreakerConfig::default()));
        }
        let mut services = self.services.write().await;
        services.entry(service.to_string()).or_default().push(replica);
        info!("registered replica for service {}", service);
    }

    /// Removes the first replica in `service`'s sequence matching `endpoint`.
    /// Leaves an empty sequence in place rather than removing the key.
    pub async fn deregister(&self, service: &str, endpoint: &str) -> bool {
        let mut services = self.services.write().await;
        if let Some(replicas) = services.get_mut(service) {
            if let Some(pos) = replicas.iter().position(|r| r.matches(service, endpoint)) {
                replicas.remove(pos);
                info!("deregistered replica {} from service {}", endpoint, service);
                return true;
            }
        }
        false
    }

    /// Returns the subsequence of `service`'s replicas with `healthy == true`,
    /// preserving insertion order.
    pub async fn healthy(&self, service: &str) -> Vec<Replica> {
        let services = self.services.read().await;
        services
            .get(service)
            .map(|replicas| replicas.iter().filter(|r| r.healthy).cloned().collect())
            .unwrap_or_default()
    }

    /// All replicas of `service`, healthy or not. Used by the Health Checker.
    pub async fn all(&self, service: &str) -> Vec<Replica> {
        let services = self.services.read().await;
        services.get(service).cloned().unwrap_or_default()
    }

    /// The set of service names currently known to the registry.
    pub async fn service_names(&self) -> Vec<String> {
        let services = self.services.read().await;
        services.keys().cloned().collect()
    }

    /// Flips the healthy flag for every replica at `endpoint` within `service`.
    pub async fn set_healthy(&self, service: &str, endpoint: &str, healthy: bool) {
        let mut services = self.services.write().await;
        if let Some(replicas) = services.get_mut(service) {
            for replica in replicas.iter_mut().filter(|r| r.endpoint == endpoint) {
                replica.healthy = healthy;
            }
        }
    }

    /// A consistent view of every service's totals and endpoints, for the
    /// `/gateway/status` admin endpoint.
    pub async fn snapshot(&self) -> HashMap<String, ServiceSnapshot> {
        let services = self.services.read().await;
        services
            .iter()
            .map(|(service, replicas)| {
                let healthy = replicas.iter().filter(|r| r.healthy).count();
                let endpoints = replicas.iter().map(|r| r.endpoint.clone()).collect();
                (
                    service.clone(),
                    ServiceSnapshot {
                        total: replicas.len(),
                        healthy,
                        endpoints,
                    },
                )
            })
            .collect()
    }

    /// Returns the circuit breaker for `service`, creating one if this is the
    /// first time it has been observed (e.g. dispatch against an
    /// as-yet-unregistered service name still needs a breaker to consult).
    pub async fn breaker_for(&self, service: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.read().await.get(service) {
            return breaker.clone();
        }
        let mut breakers = self.breakers.write().await;
        breakers
            .entry(service.to_string())
            .or_insert_with(|| CircuitBreaker::new(service.to_string(), CircuitBreakerConfig::default()))
            .clone()
    }

    /// All breakers, for the `/gateway/circuit-breaker-status` endpoint.
    pub async fn all_breakers(&self) -> HashMap<String, Arc<CircuitBreaker>> {
        self.breakers.read().await.clone()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
