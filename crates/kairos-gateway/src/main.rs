//! Kairos API Gateway Server
//!
//! High-performance HTTP reverse-proxy gateway built with Rust and Actix Web.
//! Topology is not read from a config file: services and their replicas are
//! registered at runtime through the admin interface.

use std::sync::Arc;

use kairos_rs::config::settings::Settings;
use kairos_rs::config::validation::ConfigValidator;
use kairos_rs::logs::logger::configure_logger;
use kairos_rs::middleware::security::security_headers;
use kairos_rs::routes::admin::{configure_admin, AdminState};
use kairos_rs::routes::{health, http};
use kairos_rs::services::client_pool::ClientPool;
use kairos_rs::services::health_checker::HealthChecker;
use kairos_rs::services::load_balancer::{LoadBalancerFactory, LoadBalancingStrategy};
use kairos_rs::services::proxy::ProxyHandler;
use kairos_rs::services::registry::Registry;
use kairos_rs::services::router::Router;

use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};
use tokio::signal;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    configure_logger();

    let settings = Settings::from_env();
    info!("Starting kairos-rs gateway on {}:{}", settings.host, settings.port);

    let validation = ConfigValidator::validate(&settings);
    if !validation.is_valid {
        for err in &validation.errors {
            error!("  - {err}");
        }
        std::process::exit(1);
    }

    let registry = Arc::new(Registry::new());
    let router = Router::with_defaults();
    let client_pool = Arc::new(ClientPool::new(settings.outbound_timeout));
    let load_balancer = LoadBalancerFactory::create(LoadBalancingStrategy::default());

    let proxy_handler = Arc::new(ProxyHandler::new(
        registry.clone(),
        router,
        client_pool.clone(),
        load_balancer,
        settings.outbound_timeout,
    ));

    let health_checker = Arc::new(HealthChecker::new(registry.clone(), settings.health_check_interval));
    health_checker.spawn();

    let admin_state = web::Data::new(AdminState {
        registry: registry.clone(),
        proxy: proxy_handler.clone(),
    });

    let host = settings.host.clone();
    let port = settings.port;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(admin_state.clone())
            .wrap(Logger::new(r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#))
            .wrap(actix_web::middleware::Compress::default())
            .wrap(security_headers())
            .configure(health::configure_health)
            .configure(configure_admin)
            .configure(|cfg| http::configure_route(cfg, proxy_handler.clone()))
    })
    .bind((host.as_str(), port))?
    .run();

    info!("Server started successfully");

    tokio::select! {
        result = server => {
            match result {
                Ok(_) => info!("Server stopped gracefully"),
                Err(e) => error!("Server error: {e}"),
            }
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal, stopping server...");
        }
    }

    Ok(())
}
