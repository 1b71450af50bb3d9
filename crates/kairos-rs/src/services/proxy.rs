//! The inbound request pipeline: body buffering, routing, breaker check,
//! balancing, outbound issue, response relay, and failure mapping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, warn};
use reqwest::Method;
use uuid::Uuid;

use crate::models::dispatch::{DispatchRequest, DispatchResult};
use crate::models::error::GatewayError;
use crate::services::client_pool::ClientPool;
use crate::services::load_balancer::LoadBalancer;
use crate::services::registry::Registry;
use crate::services::router::Router;
use crate::utils::path::build_target_url;

/// Header names dropped verbatim from the outbound request regardless of
/// their lower-cased form.
const DROPPED_HEADERS: &[&str] = &[
    "upgrade-insecure-requests",
    "sec-fetch-site",
    "sec-fetch-mode",
    "sec-fetch-dest",
    "sec-fetch-user",
    "dnt",
    "save-data",
    "host",
    "connection",
];

fn should_drop_header(name: &str) -> bool {
    name.starts_with("sec-") || DROPPED_HEADERS.contains(&name)
}

/// The `host:port` this replica's endpoint should be addressed as on the
/// outbound request's `Host` header.
fn replica_host_port(endpoint: &str) -> Option<String> {
    let url = endpoint.parse::<url::Url>().ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Applies the §4.7 step-8 header transforms to an outbound request
/// builder: drops the sanitized set, rewrites `Host` to the replica's
/// `host:port`, and defaults `Content-Type`/`Accept` to `application/json`
/// when the caller didn't supply them. Shared by `handle` and
/// `dispatch_raw` so both apply it identically.
fn forward_headers(
    mut builder: reqwest::RequestBuilder,
    headers: impl IntoIterator<Item = (String, String)>,
    endpoint: &str,
) -> reqwest::RequestBuilder {
    let mut has_content_type = false;
    let mut has_accept = false;
    for (name, value) in headers {
        let lower = name.to_lowercase();
        if should_drop_header(&lower) {
            continue;
        }
        if lower == "content-type" {
            has_content_type = true;
        }
        if lower == "accept" {
            has_accept = true;
        }
        builder = builder.header(name, value);
    }
    if let Some(host_port) = replica_host_port(endpoint) {
        builder = builder.header("host", host_port);
    }
    if !has_content_type {
        builder = builder.header("content-type", "application/json");
    }
    if !has_accept {
        builder = builder.header("accept", "application/json");
    }
    builder
}

/// Maps an outbound transport failure to the `GatewayError` it should be
/// reported as: a `Timeout` if the client's deadline elapsed, `Upstream`
/// otherwise.
fn upstream_error(e: reqwest::Error, outbound_timeout: Duration) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout { seconds: outbound_timeout.as_secs() }
    } else {
        GatewayError::Upstream { message: e.to_string() }
    }
}

pub struct ProxyHandler {
    registry: Arc<Registry>,
    router: Router,
    client_pool: Arc<ClientPool>,
    load_balancer: Arc<dyn LoadBalancer>,
    outbound_timeout: Duration,
}

impl ProxyHandler {
    pub fn new(
        registry: Arc<Registry>,
        router: Router,
        client_pool: Arc<ClientPool>,
        load_balancer: Arc<dyn LoadBalancer>,
        outbound_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            router,
            client_pool,
            load_balancer,
            outbound_timeout,
        }
    }

    /// Runs one inbound request through the full dispatch pipeline.
    pub async fn handle(&self, req: HttpRequest, body: web::Bytes) -> HttpResponse {
        let request_id = Uuid::new_v4().to_string();
        let path = req.path().to_string();
        let query = req.query_string().to_string();
        let host = req
            .headers()
            .get("host")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let service = self.router.resolve(&path, host.as_deref());

        let healthy = self.registry.healthy(&service).await;
        if healthy.is_empty() {
            warn!("no healthy replicas for service {service}");
            let err = GatewayError::NoHealthyReplicas { service };
            return HttpResponse::InternalServerError().json(err.with_request_id(&request_id));
        }

        let breaker = self.registry.breaker_for(&service).await;
        if !breaker.allow().await {
            debug!("circuit open for service {service}, denying dispatch");
            let err = GatewayError::CircuitOpen { service };
            return HttpResponse::InternalServerError().json(err.with_request_id(&request_id));
        }

        let Some(replica) = self.load_balancer.select(&healthy) else {
            let err = GatewayError::NoHealthyReplicas { service };
            return HttpResponse::InternalServerError().json(err.with_request_id(&request_id));
        };

        let client = match self.client_pool.client_for(&replica.endpoint).await {
            Ok(client) => client,
            Err(e) => {
                warn!("failed to obtain client for {}: {e}", replica.endpoint);
                let err = GatewayError::Upstream { message: e };
                return HttpResponse::InternalServerError().json(err.with_request_id(&request_id));
            }
        };

        let target_url = build_target_url(&replica.endpoint, &path, &query);

        let method = Method::from_bytes(req.method().as_str().as_bytes()).unwrap_or(Method::GET);
        let builder = client.request(method, &target_url);
        let incoming_headers = req
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.to_str().unwrap_or_default().to_string()));
        let builder = forward_headers(builder, incoming_headers, &replica.endpoint);

        let started = Instant::now();
        let outcome = builder.body(body.to_vec()).send().await;

        match outcome {
            Ok(response) => {
                let duration = started.elapsed();
                let status = response.status();
                debug!("dispatch {request_id} to {} completed in {duration:?} with {status}", replica.endpoint);

                let mut relayed = HttpResponse::build(
                    actix_web::http::StatusCode::from_u16(status.as_u16())
                        .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
                );
                for (name, value) in response.headers().iter() {
                    if let (Ok(n), Ok(v)) = (
                        HeaderName::from_bytes(name.as_str().as_bytes()),
                        HeaderValue::from_bytes(value.as_bytes()),
                    ) {
                        relayed.insert_header((n, v));
                    }
                }

                breaker.record(status.as_u16() < 400).await;

                match response.bytes().await {
                    Ok(body) => relayed.body(body),
                    Err(e) => {
                        warn!("failed reading upstream body for {request_id}: {e}");
                        breaker.record(false).await;
                        let err = upstream_error(e, self.outbound_timeout);
                        HttpResponse::InternalServerError().json(err.with_request_id(&request_id))
                    }
                }
            }
            Err(e) => {
                warn!("upstream call failed for {request_id}: {e}");
                breaker.record(false).await;
                let err = upstream_error(e, self.outbound_timeout);
                HttpResponse::InternalServerError().json(err.with_request_id(&request_id))
            }
        }
    }
    /// Runs a synthesized request (one not arriving over an actix
    /// `HttpRequest`) through the same routing/breaker/balancing path, for
    /// the admin `/gateway/dispatch` and `/gateway/test-dispatch`
    /// endpoints.
    pub async fn dispatch_raw(
        &self,
        method: &str,
        path: &str,
        query: &str,
        headers: &HashMap<String, String>,
        body: Vec<u8>,
    ) -> DispatchResult {
        let mut dispatch_request = DispatchRequest::new(method, path);
        dispatch_request.query = query.to_string();
        dispatch_request.body = body.clone();
        for (name, value) in headers {
            dispatch_request.headers.entry(name.clone()).or_default().push(value.clone());
        }
        let request_id = dispatch_request.request_id.clone();

        let host = headers.get("host").or_else(|| headers.get("Host")).cloned();

        // The load balancer's `select` takes only the candidate list — per
        // spec, `dispatch_request` is threaded through for future
        // per-request selection policies but is not consulted by any of the
        // current ones.
        let service = self.router.resolve(&dispatch_request.path, host.as_deref());

        let healthy = self.registry.healthy(&service).await;
        if healthy.is_empty() {
            return DispatchResult {
                request_id,
                success: false,
                message: GatewayError::NoHealthyReplicas { service }.to_string(),
                target_endpoint: None,
                processing_time_ms: 0,
            };
        }

        let breaker = self.registry.breaker_for(&service).await;
        if !breaker.allow().await {
            return DispatchResult {
                request_id,
                success: false,
                message: GatewayError::CircuitOpen { service }.to_string(),
                target_endpoint: None,
                processing_time_ms: 0,
            };
        }

        let Some(replica) = self.load_balancer.select(&healthy) else {
            return DispatchResult {
                request_id,
                success: false,
                message: GatewayError::NoHealthyReplicas { service }.to_string(),
                target_endpoint: None,
                processing_time_ms: 0,
            };
        };

        let client = match self.client_pool.client_for(&replica.endpoint).await {
            Ok(client) => client,
            Err(e) => {
                return DispatchResult {
                    request_id,
                    success: false,
                    message: GatewayError::Upstream { message: e }.to_string(),
                    target_endpoint: Some(replica.endpoint),
                    processing_time_ms: 0,
                };
            }
        };

        let target_url = build_target_url(&replica.endpoint, path, query);
        let reqwest_method = Method::from_bytes(method.as_bytes()).unwrap_or(Method::GET);
        let builder = client.request(reqwest_method, &target_url);
        let incoming_headers = headers.iter().map(|(name, value)| (name.clone(), value.clone()));
        let builder = forward_headers(builder, incoming_headers, &replica.endpoint);

        let started = Instant::now();
        let outcome = builder.body(body).send().await;
        let processing_time_ms = started.elapsed().as_millis();

        match outcome {
            Ok(response) => {
                let success = response.status().as_u16() < 400;
                breaker.record(success).await;
                DispatchResult {
                    request_id,
                    success,
                    message: format!("upstream responded with {}", response.status()),
                    target_endpoint: Some(replica.endpoint),
                    processing_time_ms,
                }
            }
            Err(e) => {
                breaker.record(false).await;
                DispatchResult {
                    request_id,
                    success: false,
                    message: upstream_error(e, self.outbound_timeout).to_string(),
                    target_endpoint: Some(replica.endpoint),
                    processing_time_ms,
                }
            }
        }
    }
}
