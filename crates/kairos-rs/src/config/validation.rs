//! Startup validation for ambient `Settings`, in the style of the gateway's
//! former route-topology validator: collect errors, warnings, and
//! recommendations, then log all three before the caller decides whether to
//! proceed.

use log::{info, warn};

use crate::config::settings::Settings;

/// Result of configuration validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates port range and timeout sanity, logging the result. Startup
    /// should exit non-zero if `is_valid` is false.
    pub fn validate(settings: &Settings) -> ValidationResult {
        let mut result = ValidationResult::new();

        if settings.port == 0 {
            result.add_error("KAIROS_GATEWAY_PORT must not be 0".to_string());
        }

        if settings.outbound_timeout.as_secs() == 0 {
            result.add_error("KAIROS_GATEWAY_TIMEOUT_SECS must be greater than 0".to_string());
        }

        if settings.health_check_interval.as_secs() < 5 {
            result.add_warning(format!(
                "health check interval of {}s is unusually low",
                settings.health_check_interval.as_secs()
            ));
        }

        if settings.host == "0.0.0.0" {
            result.add_warning("binding to 0.0.0.0 exposes the gateway on all interfaces".to_string());
        }

        Self::log_results(&result);
        result
    }

    fn log_results(result: &ValidationResult) {
        if result.is_valid {
            info!("configuration validation passed");
        } else {
            for error in &result.errors {
                log::error!("validation error: {error}");
            }
        }
        for warning in &result.warnings {
            warn!("validation warning: {warning}");
        }
    }
}
