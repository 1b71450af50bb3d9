//! Data models for the dispatch fabric.
//!
//! - [`replica`] - a single registered backend instance
//! - [`dispatch`] - the request/result pair flowing through one dispatch
//! - [`error`] - `GatewayError` and its HTTP response mapping

pub mod dispatch;
pub mod error;
pub mod replica;
