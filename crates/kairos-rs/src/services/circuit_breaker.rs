//! Circuit breaker implementation for upstream service protection.
//!
//! Three-state machine (CLOSED, OPEN, HALF_OPEN) gating outbound calls based
//! on recent success/failure signals. One instance lives per service for the
//! life of the process, shared by the Proxy Handler, the Health Checker, and
//! the admin status endpoint.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::RwLock;

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - requests pass through
    Closed = 0,
    /// Circuit is open - failing fast
    Open = 1,
    /// Testing if service is back
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        };
        write!(f, "{s}")
    }
}

/// Configuration parameters for circuit breaker behavior.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in CLOSED required to trip to OPEN.
    pub failure_threshold: u64,
    /// Consecutive successes in HALF_OPEN required to close.
    pub success_threshold: u64,
    /// How long OPEN must elapse before a HALF_OPEN probe is admitted.
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

/// A point-in-time read of a breaker's counters, for the status endpoint.
///
/// Fields are read independently without cross-field snapshot atomicity —
/// acceptable drift between `state` and the counters under concurrent load.
#[derive(Debug, Clone)]
pub struct BreakerObservation {
    pub state: CircuitState,
    pub failure_count: u64,
    pub success_count: u64,
    pub last_failure_time: Option<Instant>,
}

/// Per-service circuit breaker.
///
/// Counters use atomics for lock-free reads; only the last-failure timestamp
/// needs a lock, and it is held only across the single assignment that
/// updates it.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: AtomicU8,
    failure_count: AtomicU64,
    success_count: AtomicU64,
    last_failure_time: RwLock<Option<Instant>>,
    name: String,
}

impl CircuitBreaker {
    pub fn new(name: String, config: CircuitBreakerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            failure_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            last_failure_time: RwLock::new(None),
            name,
        })
    }

    /// Consults the machine for admission. May itself drive the OPEN ->
    /// HALF_OPEN transition if the cooldown has elapsed.
    pub async fn allow(&self) -> bool {
        match CircuitState::from(self.state.load(Ordering::Relaxed)) {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let last_failure = *self.last_failure_time.read().await;
                match last_failure {
                    Some(t) if t.elapsed() >= self.config.reset_timeout => {
                        self.transition_to_half_open().await;
                        true
                    }
                    _ => {
                        debug!("circuit breaker {} denies admission while open", self.name);
                        false
                    }
                }
            }
        }
    }

    /// Feeds the outcome of a dispatch back into the machine.
    pub async fn record(&self, success: bool) {
        if success {
            self.on_success().await;
        } else {
            self.on_failure().await;
        }
    }

    async fn on_success(&self) {
        match CircuitState::from(self.state.load(Ordering::Relaxed)) {
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Relaxed);
            }
            CircuitState::HalfOpen => {
                let successes = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
                if successes >= self.config.success_threshold {
                    self.transition_to_closed().await;
                }
            }
            CircuitState::Open => {
                debug!("unexpected success recorded while {} is open", self.name);
            }
        }
    }

    async fn on_failure(&self) {
        match CircuitState::from(self.state.load(Ordering::Relaxed)) {
            CircuitState::Closed => {
                let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
                *self.last_failure_time.write().await = Some(Instant::now());
                if failures >= self.config.failure_threshold {
                    self.transition_to_open().await;
                }
            }
            CircuitState::HalfOpen => {
                self.transition_to_open().await;
            }
            CircuitState::Open => {
                *self.last_failure_time.write().await = Some(Instant::now());
            }
        }
    }

    async fn transition_to_open(&self) {
        self.state.store(CircuitState::Open as u8, Ordering::Relaxed);
        *self.last_failure_time.write().await = Some(Instant::now());
        self.success_count.store(0, Ordering::Relaxed);
        warn!("circuit breaker {} opened", self.name);
    }

    async fn transition_to_half_open(&self) {
        self.state.store(CircuitState::HalfOpen as u8, Ordering::Relaxed);
        self.success_count.store(0, Ordering::Relaxed);
        info!("circuit breaker {} half-open, admitting probe", self.name);
    }

    async fn transition_to_closed(&self) {
        self.state.store(CircuitState::Closed as u8, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
        self.success_count.store(0, Ordering::Relaxed);
        info!("circuit breaker {} closed, service recovered", self.name);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads state and counters for the status endpoint. See
    /// `BreakerObservation` for the atomicity caveat.
    pub async fn observe(&self) -> BreakerObservation {
        BreakerObservation {
            state: CircuitState::from(self.state.load(Ordering::Relaxed)),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            success_count: self.success_count.load(Ordering::Relaxed),
            last_failure_time: *self.last_failure_time.read().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn threshold_consecutive_failures_open_the_circuit() {
        let breaker = CircuitBreaker::new("svc".into(), CircuitBreakerConfig::default());
        for _ in 0..4 {
            breaker.record(false).await;
        }
        assert_eq!(breaker.observe().await.state, CircuitState::Closed);
        breaker.record(false).await;
        assert_eq!(breaker.observe().await.state, CircuitState::Open);
    }

    #[tokio::test]
    async fn success_before_threshold_resets_failure_count() {
        let breaker = CircuitBreaker::new("svc".into(), CircuitBreakerConfig::default());
        for _ in 0..4 {
            breaker.record(false).await;
        }
        breaker.record(true).await;
        let obs = breaker.observe().await;
        assert_eq!(obs.state, CircuitState::Closed);
        assert_eq!(obs.failure_count, 0);
    }

    #[tokio::test]
    async fn open_circuit_denies_admission_until_cooldown() {
        let mut config = CircuitBreakerConfig::default();
        config.reset_timeout = Duration::from_millis(20);
        let breaker = CircuitBreaker::new("svc".into(), config);
        for _ in 0..5 {
            breaker.record(false).await;
        }
        assert!(!breaker.allow().await);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(breaker.allow().await);
        assert_eq!(breaker.observe().await.state, CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn half_open_closes_after_success_threshold() {
        let mut config = CircuitBreakerConfig::default();
        config.reset_timeout = Duration::from_millis(1);
        let breaker = CircuitBreaker::new("svc".into(), config);
        for _ in 0..5 {
            breaker.record(false).await;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(breaker.allow().await);
        breaker.record(true).await;
        breaker.record(true).await;
        assert_eq!(breaker.observe().await.state, CircuitState::HalfOpen);
        breaker.record(true).await;
        assert_eq!(breaker.observe().await.state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let mut config = CircuitBreakerConfig::default();
        config.reset_timeout = Duration::from_millis(1);
        let breaker = CircuitBreaker::new("svc".into(), config);
        for _ in 0..5 {
            breaker.record(false).await;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(breaker.allow().await);
        breaker.record(false).await;
        assert_eq!(breaker.observe().await.state, CircuitState::Open);
    }
}
