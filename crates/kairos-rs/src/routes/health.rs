//! `GET /health` — a constant liveness reply, treated as an external
//! collaborator of the dispatch fabric rather than part of it.

use actix_web::{web, HttpResponse, Result};
use serde_json::json;

pub async fn health_check() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "UP",
        "timestamp": chrono::Utc::now().timestamp_millis(),
        "gateway": "kairos-rs",
    })))
}

pub fn configure_health(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
