//! Error types produced by the dispatch fabric.
//!
//! Every failure path in the gateway resolves to one variant of
//! `GatewayError`, which in turn knows how to render itself as the JSON
//! error body the proxy and admin handlers are required to return.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no available replicas: {service}")]
    NoHealthyReplicas { service: String },

    #[error("circuit open for service: {service}")]
    CircuitOpen { service: String },

    #[error("upstream failed: {message}")]
    Upstream { message: String },

    #[error("upstream timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("invalid registration: {message}")]
    InvalidRegistration { message: String },

    #[error("missing required field: {field}")]
    MissingField { field: String },
}

impl GatewayError {
    /// The `requestId` carried on synthesized proxy failure responses.
    ///
    /// Admin-surface errors (bad registration payloads) have no request id
    /// of their own, so this is only populated by the proxy handler.
    pub fn with_request_id(&self, request_id: &str) -> serde_json::Value {
        json!({
            "error": self.to_string(),
            "requestId": request_id,
        })
    }
}

impl ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        match self {
            GatewayError::MissingField { .. } | GatewayError::InvalidRegistration { .. } => {
                HttpResponse::BadRequest().json(json!({ "error": self.to_string() }))
            }
            // All dispatch-path failures are synthesized as 500s per spec, whether
            // the cause is routing, breaker state, or the upstream itself.
            GatewayError::NoHealthyReplicas { .. }
            | GatewayError::CircuitOpen { .. }
            | GatewayError::Upstream { .. }
            | GatewayError::Timeout { .. } => {
                HttpResponse::InternalServerError().json(json!({ "error": self.to_string() }))
            }
        }
    }
}
