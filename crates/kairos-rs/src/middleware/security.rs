//! Baseline security response headers. Does not authenticate callers and
//! does not handle CORS — neither conflicts with this gateway's non-goals.

use actix_web::middleware::DefaultHeaders;

/// Headers applied to every response: MIME sniffing protection, clickjacking
/// protection, and a conservative HSTS/CSP/referrer baseline.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("X-XSS-Protection", "1; mode=block"))
        .add(("Strict-Transport-Security", "max-age=63072000; includeSubDomains"))
        .add(("Referrer-Policy", "no-referrer-when-downgrade"))
        .add(("Content-Security-Policy", "default-src 'self'"))
}
