//! obsdemo server library entry.
//!
//! Wires config, the metrics registry, request middleware and the demo routes
//! into an axum router. Consumed by the binary (`main.rs`) and by integration
//! tests, which build their own `AppState` per test.

pub mod app_state;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod middleware;
pub mod obs;
pub mod ops;
pub mod router;
pub mod routes;
