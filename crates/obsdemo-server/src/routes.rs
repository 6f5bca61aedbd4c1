//! Demo route handlers.
//!
//! Each route is a stateless responder; `/crash` ends the process and `/slow`
//! parks only its own task.

use std::time::Duration;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use rand::Rng;

use obsdemo_core::error::ObsDemoError;
use obsdemo_core::protocol::body::{ErrorBody, HealthBody, LogsBody};

use crate::app_state::AppState;
use crate::config::{SlowMode, SlowSection};
use crate::error::AppError;
use crate::logging::APP_LOG_TARGET;

pub const SLOW_BODY: &str = "Async task completed";

pub async fn root(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let host = state.hostname().hostname()?;
    Ok(Html(format!("<h1>Hello World from {host}</h1>")))
}

pub async fn healthy(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody::healthy(state.cfg().app.display_name.clone()))
}

pub async fn server_error() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new("Internal server error", 500)),
    )
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not Found", 404)))
}

pub async fn logs() -> Json<LogsBody> {
    tracing::info!(target: APP_LOG_TARGET, route = "/logs", "Testing: Logs");
    Json(LogsBody {
        objective: "To generate logs".into(),
    })
}

/// Terminate the whole process with status 1. No response, no cleanup.
pub async fn crash() -> StatusCode {
    tracing::error!("crash requested, terminating process");
    std::process::exit(1)
}

/// Pick the delay for one `/slow` request.
pub fn slow_delay(cfg: &SlowSection) -> Duration {
    let ms = match cfg.mode {
        SlowMode::Fixed => cfg.fixed_ms,
        SlowMode::Random => rand::thread_rng().gen_range(0..=cfg.max_ms),
    };
    Duration::from_millis(ms)
}

/// The wait runs in its own task: a client disconnect drops this handler but
/// not the timer, so the gauge is still set when the delay elapses.
pub async fn slow(State(state): State<AppState>, method: Method) -> &'static str {
    let delay = slow_delay(&state.cfg().slow);

    let task = tokio::spawn(async move {
        let gauge = &state.http_metrics().slow_task_duration;
        let timer = gauge.start_timer(&[method.as_str(), "200"]);
        tokio::time::sleep(delay).await;
        match timer {
            Ok(t) => {
                let secs = t.stop();
                tracing::debug!(secs, "slow task finished");
            }
            Err(e) => tracing::warn!(error = %e, "slow task gauge unavailable"),
        }
    });
    if let Err(e) = task.await {
        tracing::warn!(error = %e, "slow task did not complete");
    }
    SLOW_BODY
}

/// Any path without a route.
pub async fn fallback() -> AppError {
    AppError(ObsDemoError::NotFound("no such route".into()))
}
