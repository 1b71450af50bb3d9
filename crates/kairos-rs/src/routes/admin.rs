//! Administrative HTTP interface: register/deregister replicas, read
//! registry and breaker status, and run a canned test dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse, Result};
use serde::Deserialize;
use serde_json::json;

use crate::models::error::GatewayError;
use crate::models::replica::Replica;
use crate::services::proxy::ProxyHandler;
use crate::services::registry::Registry;

/// Shared application state handed to every admin route.
pub struct AdminState {
    pub registry: Arc<Registry>,
    pub proxy: Arc<ProxyHandler>,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    #[serde(rename = "serviceName")]
    pub service_name: Option<String>,
    #[serde(rename = "projectName")]
    pub project_name: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default, rename = "healthPath")]
    pub health_path: Option<String>,
}

/// Reads a required, non-empty field off a registration body, or fails with
/// `GatewayError::MissingField`, which `?` converts into a `400` response
/// via `GatewayError`'s `ResponseError` impl.
fn require_field(value: &Option<String>, field: &str) -> std::result::Result<String, GatewayError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.clone()),
        _ => Err(GatewayError::MissingField { field: field.to_string() }),
    }
}

#[post("/gateway/register")]
pub async fn register(state: web::Data<AdminState>, body: web::Json<RegistrationRequest>) -> Result<HttpResponse> {
    let service = require_field(&body.service_name, "serviceName")?;
    let project = require_field(&body.project_name, "projectName")?;
    let endpoint = require_field(&body.endpoint, "endpoint")?;

    Replica::validate_endpoint(&endpoint)
        .map_err(|message| GatewayError::InvalidRegistration { message })?;

    let mut replica = Replica::new(&service, &project, &endpoint);
    replica.health_path = body.health_path.clone();
    state.registry.register(&service, replica).await;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("registered {project} for service {service}"),
    })))
}

#[post("/gateway/deregister")]
pub async fn deregister(state: web::Data<AdminState>, body: web::Json<RegistrationRequest>) -> Result<HttpResponse> {
    let service = require_field(&body.service_name, "serviceName")?;
    let endpoint = require_field(&body.endpoint, "endpoint")?;

    let removed = state.registry.deregister(&service, &endpoint).await;
    let message = if removed {
        format!("deregistered {endpoint} from service {service}")
    } else {
        format!("no matching replica {endpoint} for service {service}")
    };

    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

#[get("/gateway/status")]
pub async fn status(state: web::Data<AdminState>) -> Result<HttpResponse> {
    let snapshot = state.registry.snapshot().await;
    let body: serde_json::Map<String, serde_json::Value> = snapshot
        .into_iter()
        .map(|(service, s)| {
            (
                service,
                json!({
                    "totalProjects": s.total,
                    "healthyProjects": s.healthy,
                    "endpoints": s.endpoints,
                }),
            )
        })
        .collect();
    Ok(HttpResponse::Ok().json(body))
}

#[get("/gateway/circuit-breaker-status")]
pub async fn circuit_breaker_status(state: web::Data<AdminState>) -> Result<HttpResponse> {
    let breakers = state.registry.all_breakers().await;
    let mut body = serde_json::Map::new();
    for (service, breaker) in breakers {
        let observation = breaker.observe().await;
        body.insert(
            service,
            json!({
                "state": observation.state.to_string(),
                "failureCount": observation.failure_count,
                "successCount": observation.success_count,
                "lastFailureTime": observation.last_failure_time.map(|_| "recorded"),
            }),
        );
    }
    Ok(HttpResponse::Ok().json(body))
}

#[get("/gateway/test-dispatch")]
pub async fn test_dispatch(state: web::Data<AdminState>) -> Result<HttpResponse> {
    let mut headers = HashMap::new();
    headers.insert("host".to_string(), "dushu.com".to_string());
    let result = state
        .proxy
        .dispatch_raw("GET", "/user-orch/profile", "", &headers, Vec::new())
        .await;
    Ok(HttpResponse::Ok().json(json!({ "message": result.message })))
}

#[derive(Debug, Deserialize)]
pub struct DispatchRequestBody {
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub parameters: String,
}

fn default_method() -> String {
    "GET".to_string()
}

#[post("/gateway/dispatch")]
pub async fn dispatch(state: web::Data<AdminState>, body: web::Json<DispatchRequestBody>) -> Result<HttpResponse> {
    let result = state
        .proxy
        .dispatch_raw(
            &body.method,
            &body.path,
            &body.parameters,
            &body.headers,
            body.body.clone().into_bytes(),
        )
        .await;

    Ok(HttpResponse::Ok().json(json!({
        "requestId": result.request_id,
        "success": result.success,
        "message": result.message,
        "targetEndpoint": result.target_endpoint,
        "processingTime": result.processing_time_ms,
    })))
}

pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(deregister)
        .service(status)
        .service(circuit_breaker_status)
        .service(test_dispatch)
        .service(dispatch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use std::time::Duration;

    use crate::services::client_pool::ClientPool;
    use crate::services::load_balancer::{LoadBalancerFactory, LoadBalancingStrategy};
    use crate::services::router::Router;

    fn test_state() -> web::Data<AdminState> {
        let registry = Arc::new(Registry::new());
        let proxy = Arc::new(ProxyHandler::new(
            registry.clone(),
            Router::with_defaults(),
            Arc::new(ClientPool::new(Duration::from_secs(50))),
            LoadBalancerFactory::create(LoadBalancingStrategy::WeightedRandom),
            Duration::from_secs(50),
        ));
        web::Data::new(AdminState { registry, proxy })
    }

    #[actix_web::test]
    async fn register_then_status_reports_replica() {
        let state = test_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_admin)).await;

        let req = test::TestRequest::post()
            .uri("/gateway/register")
            .set_json(json!({
                "serviceName": "user-orch",
                "projectName": "u1",
                "endpoint": "http://127.0.0.1:9001"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get().uri("/gateway/status").to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["user-orch"]["totalProjects"], 1);
    }

    #[actix_web::test]
    async fn register_missing_field_is_rejected() {
        let state = test_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_admin)).await;

        let req = test::TestRequest::post()
            .uri("/gateway/register")
            .set_json(json!({ "serviceName": "user-orch" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("missing required field: projectName"));
    }

    #[actix_web::test]
    async fn deregister_drains_the_service() {
        let state = test_state();
        state
            .registry
            .register("user-orch", Replica::new("user-orch", "u1", "http://127.0.0.1:9001"))
            .await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_admin)).await;

        let req = test::TestRequest::post()
            .uri("/gateway/deregister")
            .set_json(json!({ "serviceName": "user-orch", "endpoint": "http://127.0.0.1:9001" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        assert!(state.registry.healthy("user-orch").await.is_empty());
    }

    #[actix_web::test]
    async fn test_dispatch_against_empty_registry_reports_failure() {
        let state = test_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_admin)).await;
        let req = test::TestRequest::get().uri("/gateway/test-dispatch").to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(resp["message"].as_str().unwrap().contains("no available"));
    }

    #[actix_web::test]
    async fn malformed_endpoint_is_rejected_at_registration() {
        let state = test_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_admin)).await;
        let req = test::TestRequest::post()
            .uri("/gateway/register")
            .set_json(json!({
                "serviceName": "user-orch",
                "projectName": "u1",
                "endpoint": "not-a-url"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("invalid registration"));
    }
}
