//! The catch-all HTTP proxy route: every path not claimed by an admin or
//! health endpoint is handed to the `ProxyHandler`.

use std::sync::Arc;

use actix_web::{web, HttpRequest};

use crate::services::proxy::ProxyHandler;

const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Registers the `/{tail:.*}` catch-all resource, bounded to a 1MB body.
pub fn configure_route(cfg: &mut web::ServiceConfig, handler: Arc<ProxyHandler>) {
    cfg.app_data(web::PayloadConfig::new(MAX_PAYLOAD_BYTES)).service(
        web::resource("/{tail:.*}").to(move |req: HttpRequest, body: web::Bytes| {
            let handler = handler.clone();
            async move { handler.handle(req, body).await }
        }),
    );
}
