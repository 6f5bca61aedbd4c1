//! HTTP request metrics and the families the demo routes write to.

use std::sync::Arc;
use std::time::Duration;

use obsdemo_core::error::Result;

use super::metrics::{Counter, Gauge, Histogram, Summary};
use super::registry::Registry;
use crate::config::MetricsSection;

/// Label names of every request-scoped family, in recording order.
pub const REQUEST_LABELS: [&str; 3] = ["method", "route", "status_code"];

/// One finished request, as seen by the timer middleware.
#[derive(Debug, Clone)]
pub struct RequestObservation<'a> {
    pub method: &'a str,
    pub route: &'a str,
    pub status_code: u16,
    pub duration: Duration,
}

pub struct HttpMetrics {
    pub requests_total: Arc<Counter>,
    pub request_duration: Arc<Histogram>,
    pub request_duration_summary: Arc<Summary>,
    pub slow_task_duration: Arc<Gauge>,
}

impl HttpMetrics {
    /// Build the request families and register them in `registry`.
    pub fn register(registry: &Registry, cfg: &MetricsSection) -> Result<Self> {
        let requests_total = Arc::new(Counter::new(
            "http_requests_total",
            "Total number of HTTP requests",
            &REQUEST_LABELS,
        )?);
        let request_duration = Arc::new(Histogram::new(
            "http_request_duration_seconds",
            "Duration of HTTP requests in seconds",
            &REQUEST_LABELS,
            &cfg.histogram_buckets,
        )?);
        let request_duration_summary = Arc::new(Summary::new(
            "http_request_duration_summary_seconds",
            "Summary of the duration of HTTP requests in seconds",
            &REQUEST_LABELS,
            &cfg.summary_quantiles,
            cfg.summary_reservoir,
        )?);
        let slow_task_duration = Arc::new(Gauge::new(
            "slow_task_duration_seconds",
            "Duration of the last simulated slow task in seconds",
            &["method", "status"],
        )?);

        registry.register(requests_total.clone())?;
        registry.register(request_duration.clone())?;
        registry.register(request_duration_summary.clone())?;
        registry.register(slow_task_duration.clone())?;

        Ok(Self {
            requests_total,
            request_duration,
            request_duration_summary,
            slow_task_duration,
        })
    }

    /// Apply one observation to the counter, histogram and summary.
    pub fn record(&self, obs: &RequestObservation<'_>) -> Result<()> {
        let status = obs.status_code.to_string();
        let values = [obs.method, obs.route, status.as_str()];

        self.requests_total.inc(&values)?;
        self.request_duration.observe(&values, obs.duration)?;
        self.request_duration_summary.observe(&values, obs.duration)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn record_updates_all_three_families() {
        let reg = Registry::new();
        let m = HttpMetrics::register(&reg, &MetricsSection::default()).unwrap();

        for _ in 0..4 {
            m.record(&RequestObservation {
                method: "GET",
                route: "/healthy",
                status_code: 200,
                duration: Duration::from_millis(3),
            })
            .unwrap();
        }

        let key = ["GET", "/healthy", "200"];
        assert_eq!(m.requests_total.get(&key), Some(4));
        assert_eq!(m.request_duration.count(&key), Some(4));
        assert_eq!(m.request_duration_summary.count(&key), Some(4));
        assert_eq!(m.request_duration.bucket(&key, 0.1), Some(4));
    }

    #[test]
    fn registering_twice_in_one_registry_fails() {
        let reg = Registry::new();
        HttpMetrics::register(&reg, &MetricsSection::default()).unwrap();
        assert!(HttpMetrics::register(&reg, &MetricsSection::default()).is_err());
    }
}
