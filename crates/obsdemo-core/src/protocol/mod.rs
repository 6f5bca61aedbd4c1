//! Response bodies of the demo routes.
//!
//! The JSON shapes live here so the server and integration tests agree on the
//! field names (`statusCode` is camelCase on the wire).

pub mod body;

/// Content type of the Prometheus text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
