//! Shared helpers for router-level tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};

use obsdemo_server::app_state::AppState;
use obsdemo_server::config::{AppConfig, SlowMode};
use obsdemo_server::host::StaticHostname;

pub const HOST: &str = "demo-host-7";

/// Defaults with a short fixed `/slow` delay and a stable hostname.
pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.app.name = "test-app".into();
    cfg.slow.mode = SlowMode::Fixed;
    cfg.slow.fixed_ms = 20;
    cfg
}

pub fn state_with(cfg: AppConfig) -> AppState {
    AppState::with_hostname(cfg, Arc::new(StaticHostname(HOST.into()))).expect("state")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
