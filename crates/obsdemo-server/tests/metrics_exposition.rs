//! Request instrumentation as seen through `/metrics`.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::{middleware, routing::get as get_route, Router};
use tower::ServiceExt;

use obsdemo_core::protocol::EXPOSITION_CONTENT_TYPE;
use obsdemo_server::config::SlowMode;
use obsdemo_server::middleware::request_timer;
use obsdemo_server::router::build_router;

use common::{body_string, get, state_with, test_config};

/// Every non-comment line must be `name{labels} value` with a numeric value.
fn assert_exposition(text: &str) {
    for line in text.lines() {
        if line.starts_with("# HELP ") || line.starts_with("# TYPE ") {
            continue;
        }
        assert!(!line.starts_with('#'), "unexpected comment: {line}");
        let (series, value) = line.rsplit_once(' ').unwrap_or_else(|| panic!("no value: {line}"));
        assert!(!series.is_empty());
        assert!(
            value.parse::<f64>().is_ok() || matches!(value, "+Inf" | "-Inf" | "NaN"),
            "bad value in {line}"
        );
        if let Some(open) = series.find('{') {
            assert!(series.ends_with('}'), "unbalanced labels: {line}");
            assert!(open > 0);
        }
    }
}

fn sample_value(text: &str, series: &str) -> Option<f64> {
    text.lines()
        .find_map(|l| l.strip_prefix(series).and_then(|rest| rest.strip_prefix(' ')))
        .and_then(|v| v.parse().ok())
}

#[tokio::test]
async fn counter_equals_request_count() {
    let state = state_with(test_config());
    let app = build_router(state.clone());

    for _ in 0..5 {
        let resp = app.clone().oneshot(get("/healthy")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    for _ in 0..2 {
        app.clone().oneshot(get("/serverError")).await.unwrap();
    }

    let m = state.http_metrics();
    assert_eq!(m.requests_total.get(&["GET", "/healthy", "200"]), Some(5));
    assert_eq!(m.requests_total.get(&["GET", "/serverError", "500"]), Some(2));

    let resp = app.oneshot(get("/metrics")).await.unwrap();
    let text = body_string(resp).await;
    assert_eq!(
        sample_value(
            &text,
            "http_requests_total{app=\"test-app\",method=\"GET\",route=\"/healthy\",status_code=\"200\"}"
        ),
        Some(5.0)
    );
    assert_eq!(
        sample_value(
            &text,
            "http_request_duration_seconds_count{app=\"test-app\",method=\"GET\",route=\"/serverError\",status_code=\"500\"}"
        ),
        Some(2.0)
    );
}

#[tokio::test]
async fn exposition_covers_every_registered_family() {
    let mut cfg = test_config();
    cfg.metrics.collect_default_metrics = false;
    let state = state_with(cfg);
    let app = build_router(state.clone());

    app.clone().oneshot(get("/")).await.unwrap();
    app.clone().oneshot(get("/slow")).await.unwrap();

    let resp = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], EXPOSITION_CONTENT_TYPE);
    let text = body_string(resp).await;

    assert_exposition(&text);
    for name in state.registry().metric_names() {
        assert!(text.contains(&format!("# HELP {name} ")), "no HELP for {name}");
        assert!(text.contains(&format!("# TYPE {name} ")), "no TYPE for {name}");
        let has_sample = text
            .lines()
            .filter(|l| !l.starts_with('#'))
            .any(|l| l.starts_with(name.as_str()));
        assert!(has_sample, "no sample for {name}");
    }
}

#[tokio::test]
async fn default_metrics_are_exported() {
    let app = build_router(state_with(test_config()));
    let resp = app.oneshot(get("/metrics")).await.unwrap();
    let text = body_string(resp).await;

    assert_exposition(&text);
    assert!(text.contains("tokio_runtime_workers{app=\"test-app\"} "));
    #[cfg(unix)]
    assert!(text.contains("# TYPE process_cpu_seconds_total counter"));
}

#[tokio::test]
async fn slow_observations_stay_within_delay_bounds() {
    let mut cfg = test_config();
    cfg.slow.mode = SlowMode::Random;
    cfg.slow.max_ms = 100;
    let state = state_with(cfg);
    let app = build_router(state.clone());

    for _ in 0..3 {
        app.clone().oneshot(get("/slow")).await.unwrap();
    }

    let m = state.http_metrics();
    let key = ["GET", "/slow", "200"];
    assert_eq!(m.request_duration.count(&key), Some(3));
    assert_eq!(m.request_duration.bucket(&key, 0.5), Some(3));
    let p99 = m.request_duration_summary.quantile(&key, 0.99).unwrap();
    assert!(p99 < 0.5, "p99 {p99} outside bounds");

    let gauge = m.slow_task_duration.get(&["GET", "200"]).unwrap();
    assert!((0.0..0.5).contains(&gauge));

    let text = body_string(app.oneshot(get("/metrics")).await.unwrap()).await;
    assert_eq!(
        sample_value(
            &text,
            "http_request_duration_seconds_bucket{app=\"test-app\",method=\"GET\",route=\"/slow\",status_code=\"200\",le=\"0.5\"}"
        ),
        Some(3.0)
    );
    assert!(text.contains(
        "http_request_duration_summary_seconds{app=\"test-app\",method=\"GET\",route=\"/slow\",status_code=\"200\",quantile=\"0.5\"}"
    ));
}

#[tokio::test]
async fn unmatched_paths_share_one_route_label() {
    let state = state_with(test_config());
    let app = build_router(state.clone());

    app.clone().oneshot(get("/a")).await.unwrap();
    app.oneshot(get("/b/c")).await.unwrap();

    let m = state.http_metrics();
    assert_eq!(m.requests_total.get(&["GET", "unmatched", "404"]), Some(2));
}

async fn boom() -> &'static str {
    tokio::time::sleep(Duration::from_millis(1)).await;
    panic!("handler blew up")
}

#[tokio::test]
async fn panicking_handler_is_recorded_as_500() {
    let state = state_with(test_config());
    let app: Router = Router::new()
        .route("/boom", get_route(boom))
        .layer(middleware::from_fn_with_state(state.clone(), request_timer))
        .with_state(state.clone());

    let resp = app.oneshot(get("/boom")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let m = state.http_metrics();
    assert_eq!(m.requests_total.get(&["GET", "/boom", "500"]), Some(1));
}
