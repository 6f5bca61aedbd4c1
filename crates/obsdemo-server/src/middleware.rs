//! Request middleware: access log (outermost) and request timer.
//!
//! The timer records every request that returns, including handler panics,
//! which it turns into a 500 and records with `status_code="500"`. `/crash`
//! never returns, so it is never recorded.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::logging::ACCESS_LOG_TARGET;
use crate::obs::RequestObservation;

/// Route label for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// One line per request: method, path, status, latency.
pub async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let start = Instant::now();

    let res = next.run(req).await;

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let status = res.status().as_u16();
    tracing::info!(
        target: ACCESS_LOG_TARGET,
        %method,
        %path,
        status,
        elapsed_ms,
        "{method} {path} {status} {elapsed_ms:.3} ms"
    );
    res
}

/// Time the request and feed the request families.
pub async fn request_timer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());

    let res = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(res) => res,
        Err(_) => {
            tracing::error!(%method, %route, "handler panicked");
            AppError::internal("handler panicked").into_response()
        }
    };

    let obs = RequestObservation {
        method: &method,
        route: &route,
        status_code: res.status().as_u16(),
        duration: start.elapsed(),
    };
    if let Err(e) = state.http_metrics().record(&obs) {
        tracing::warn!(error = %e, "request observation dropped");
    }
    res
}
