//! Axum router wiring.
//!
//! Layer order, outermost first: access log, request timer, handler.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, middleware as mw, ops, routes};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/healthy", get(routes::healthy))
        .route("/serverError", get(routes::server_error))
        .route("/notFound", get(routes::not_found))
        .route("/logs", get(routes::logs))
        .route("/crash", get(routes::crash))
        .route("/slow", get(routes::slow))
        .route("/metrics", get(ops::metrics))
        .fallback(routes::fallback)
        .layer(middleware::from_fn_with_state(state.clone(), mw::request_timer))
        .layer(middleware::from_fn(mw::access_log))
        .with_state(state)
}
