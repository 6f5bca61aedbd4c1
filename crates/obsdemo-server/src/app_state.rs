//! Shared application state.
//!
//! Owns the config, the metrics registry and the request families, and the
//! hostname provider. Built once at startup; cloning is an `Arc` bump.

use std::sync::Arc;

use obsdemo_core::error::Result;

use crate::config::AppConfig;
use crate::host::{HostnameProvider, SystemHostname};
use crate::obs::process::ProcessCollector;
use crate::obs::{DefaultLabels, HttpMetrics, Registry};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: AppConfig,
    registry: Registry,
    http: HttpMetrics,
    hostname: Arc<dyn HostnameProvider>,
}

impl AppState {
    /// Build application state using the OS hostname.
    pub fn new(cfg: AppConfig) -> Result<Self> {
        Self::with_hostname(cfg, Arc::new(SystemHostname))
    }

    pub fn with_hostname(cfg: AppConfig, hostname: Arc<dyn HostnameProvider>) -> Result<Self> {
        cfg.validate()?;

        let registry = Registry::with_default_labels(DefaultLabels::new(cfg.default_labels())?);

        if cfg.metrics.collect_default_metrics {
            registry.register(Arc::new(ProcessCollector::new()?))?;
        }
        let http = HttpMetrics::register(&registry, &cfg.metrics)?;

        tracing::info!(
            app = %cfg.app.name,
            metrics = registry.metric_names().len(),
            "metrics registry ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, registry, http, hostname }),
        })
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn http_metrics(&self) -> &HttpMetrics {
        &self.inner.http
    }

    pub fn hostname(&self) -> Arc<dyn HostnameProvider> {
        Arc::clone(&self.inner.hostname)
    }
}
