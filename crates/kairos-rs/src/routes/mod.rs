//! HTTP route handlers and endpoint definitions for the kairos-rs gateway.
//!
//! - [`admin`] - registry/breaker administration and synthetic dispatch
//! - [`health`] - liveness endpoint
//! - [`http`] - the catch-all proxy route

pub mod admin;
pub mod health;
pub mod http;
