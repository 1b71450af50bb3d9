//! Ambient application settings, read once at startup from environment
//! variables. There is no topology configuration file — the service
//! registry is populated entirely at runtime through the admin interface.

use std::env;
use std::time::Duration;

/// Gateway-wide settings sourced from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub outbound_timeout: Duration,
    pub health_check_interval: Duration,
}

impl Settings {
    /// Loads settings from the environment, falling back to the documented
    /// defaults for any variable that is unset or unparsable.
    pub fn from_env() -> Self {
        Self {
            host: env::var("KAIROS_GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("KAIROS_GATEWAY_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            outbound_timeout: Duration::from_secs(
                env::var("KAIROS_GATEWAY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(50),
            ),
            health_check_interval: Duration::from_secs(
                env::var("KAIROS_HEALTHCHECK_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(50),
            ),
        }
    }
}
