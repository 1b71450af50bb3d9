//! `DispatchRequest` / `DispatchResult` — the data that flows through a
//! single proxied request, independent of the HTTP framework carrying it.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single inbound request as seen by the dispatch pipeline.
///
/// Built once per request at the top of the proxy handler and consumed by
/// routing, balancing, and forwarding in turn.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub headers: AHashMap<String, Vec<String>>,
    pub body: Vec<u8>,
    pub query: String,
}

impl DispatchRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            method: method.into(),
            path: path.into(),
            headers: AHashMap::new(),
            body: Vec::new(),
            query: String::new(),
        }
    }
}

/// The outcome of running one `DispatchRequest` through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub request_id: String,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_endpoint: Option<String>,
    pub processing_time_ms: u128,
}
