//! End-to-end tests exercising the full request pipeline: registry, router,
//! circuit breaker, load balancer, client pool and proxy handler wired
//! together the way `kairos-gateway`'s `main.rs` wires them.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{test, App};

use kairos_rs::models::replica::Replica;
use kairos_rs::routes::admin::{configure_admin, AdminState};
use kairos_rs::routes::http;
use kairos_rs::services::client_pool::ClientPool;
use kairos_rs::services::load_balancer::{LoadBalancerFactory, LoadBalancingStrategy};
use kairos_rs::services::proxy::ProxyHandler;
use kairos_rs::services::registry::Registry;
use kairos_rs::services::router::Router;

fn build_handler(registry: Arc<Registry>) -> Arc<ProxyHandler> {
    Arc::new(ProxyHandler::new(
        registry,
        Router::with_defaults(),
        Arc::new(ClientPool::new(Duration::from_secs(50))),
        LoadBalancerFactory::create(LoadBalancingStrategy::WeightedRandom),
        Duration::from_secs(50),
    ))
}

#[actix_web::test]
async fn proxying_to_a_service_with_no_replicas_returns_500() {
    let registry = Arc::new(Registry::new());
    let handler = build_handler(registry.clone());

    let app = test::init_service(
        App::new().configure(|cfg| http::configure_route(cfg, handler.clone())),
    )
    .await;

    let req = test::TestRequest::get().uri("/order/items").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("no available replicas"));
}

#[actix_web::test]
async fn proxying_unmatched_host_falls_back_to_default_service() {
    let registry = Arc::new(Registry::new());
    let handler = build_handler(registry.clone());

    let app = test::init_service(
        App::new().configure(|cfg| http::configure_route(cfg, handler.clone())),
    )
    .await;

    // No rule matches this path/host, so it resolves to the default service,
    // which also has no replicas registered.
    let req = test::TestRequest::get().uri("/nowhere").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
}

#[actix_web::test]
async fn admin_register_makes_a_replica_immediately_eligible() {
    let registry = Arc::new(Registry::new());
    registry
        .register("order-service", Replica::new("order-service", "p1", "http://127.0.0.1:65535"))
        .await;

    let snapshot = registry.snapshot().await;
    let entry = snapshot.get("order-service").expect("service present");
    assert_eq!(entry.total, 1);
    assert_eq!(entry.healthy, 1);
}

#[actix_web::test]
async fn repeated_upstream_failures_open_the_circuit_and_short_circuit_dispatch() {
    let registry = Arc::new(Registry::new());
    // Port 1 is reserved and will refuse connections immediately.
    registry
        .register("order-service", Replica::new("order-service", "p1", "http://127.0.0.1:1"))
        .await;
    let handler = build_handler(registry.clone());

    let app = test::init_service(
        App::new().configure(|cfg| http::configure_route(cfg, handler.clone())),
    )
    .await;

    for _ in 0..5 {
        let req = test::TestRequest::get().uri("/order/items").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);
    }

    let breaker = registry.breaker_for("order-service").await;
    assert!(!breaker.allow().await, "breaker should be open after 5 consecutive failures");

    let req = test::TestRequest::get().uri("/order/items").to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("circuit open"));
}

#[actix_web::test]
async fn full_admin_and_proxy_surface_share_one_registry() {
    let registry = Arc::new(Registry::new());
    let proxy = build_handler(registry.clone());
    let admin_state = actix_web::web::Data::new(AdminState {
        registry: registry.clone(),
        proxy: proxy.clone(),
    });

    let app = test::init_service(
        App::new()
            .app_data(admin_state.clone())
            .configure(configure_admin)
            .configure(|cfg| http::configure_route(cfg, proxy.clone())),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/gateway/register")
        .set_json(serde_json::json!({
            "serviceName": "product-service",
            "projectName": "p1",
            "endpoint": "http://127.0.0.1:1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::get().uri("/gateway/status").to_request();
    let status: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(status["product-service"]["totalProjects"], 1);

    // The proxy route now resolves /product/... against the just-registered replica.
    let req = test::TestRequest::get().uri("/product/catalog").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500); // connection refused, but routed correctly (not "no available replicas")
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("upstream failed"));
}
