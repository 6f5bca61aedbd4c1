use std::collections::BTreeMap;
use std::net::SocketAddr;

use obsdemo_core::error::{ObsDemoError, Result};
use serde::Deserialize;

use crate::obs::metrics::{
    validate_buckets, validate_quantiles, DEFAULT_BUCKETS, DEFAULT_QUANTILES, DEFAULT_RESERVOIR,
};

/// Upper bound for any simulated delay.
const MAX_DELAY_MS: u64 = 60_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub app: AppSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub slow: SlowSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            app: AppSection::default(),
            metrics: MetricsSection::default(),
            slow: SlowSection::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ObsDemoError::UnsupportedVersion);
        }
        self.server.validate()?;
        self.app.validate()?;
        self.metrics.validate()?;
        self.slow.validate()?;
        Ok(())
    }

    /// Apply `PORT` and `APP_NAME` overrides from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|e| ObsDemoError::BadRequest(format!("PORT must be a port number: {e}")))?;
            let mut addr = self.server.listen_addr()?;
            addr.set_port(port);
            self.server.listen = addr.to_string();
        }
        if let Some(name) = lookup("APP_NAME") {
            self.app.name = name;
        }
        Ok(())
    }

    /// Default labels with `app` filled from `app.name` unless set explicitly.
    pub fn default_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.metrics.default_labels.clone();
        labels
            .entry("app".to_string())
            .or_insert_with(|| self.app.name.clone());
        labels
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

impl ServerSection {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| ObsDemoError::BadRequest(format!("server.listen must be a socket address: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8000".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppSection {
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Shown in the `/healthy` body.
    #[serde(default = "default_display_name")]
    pub display_name: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            display_name: default_display_name(),
        }
    }
}

impl AppSection {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ObsDemoError::BadRequest("app.name must not be empty".into()));
        }
        Ok(())
    }
}

fn default_app_name() -> String {
    "example-app".into()
}
fn default_display_name() -> String {
    "Observability demo".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default)]
    pub default_labels: BTreeMap<String, String>,

    #[serde(default = "default_true")]
    pub collect_default_metrics: bool,

    #[serde(default = "default_buckets")]
    pub histogram_buckets: Vec<f64>,

    #[serde(default = "default_quantiles")]
    pub summary_quantiles: Vec<f64>,

    #[serde(default = "default_reservoir")]
    pub summary_reservoir: usize,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            default_labels: BTreeMap::new(),
            collect_default_metrics: true,
            histogram_buckets: default_buckets(),
            summary_quantiles: default_quantiles(),
            summary_reservoir: default_reservoir(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        validate_buckets(&self.histogram_buckets)?;
        validate_quantiles(&self.summary_quantiles)?;
        if self.summary_reservoir == 0 {
            return Err(ObsDemoError::BadRequest(
                "metrics.summary_reservoir must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
fn default_buckets() -> Vec<f64> {
    DEFAULT_BUCKETS.to_vec()
}
fn default_quantiles() -> Vec<f64> {
    DEFAULT_QUANTILES.to_vec()
}
fn default_reservoir() -> usize {
    DEFAULT_RESERVOIR
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlowMode {
    /// Uniform delay in `0..=max_ms`.
    Random,
    /// Always `fixed_ms`.
    Fixed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlowSection {
    #[serde(default = "default_slow_mode")]
    pub mode: SlowMode,

    #[serde(default = "default_delay_ms")]
    pub fixed_ms: u64,

    #[serde(default = "default_delay_ms")]
    pub max_ms: u64,
}

impl Default for SlowSection {
    fn default() -> Self {
        Self {
            mode: default_slow_mode(),
            fixed_ms: default_delay_ms(),
            max_ms: default_delay_ms(),
        }
    }
}

impl SlowSection {
    pub fn validate(&self) -> Result<()> {
        if self.fixed_ms > MAX_DELAY_MS || self.max_ms > MAX_DELAY_MS {
            return Err(ObsDemoError::BadRequest(format!(
                "slow.fixed_ms and slow.max_ms must not exceed {MAX_DELAY_MS}"
            )));
        }
        Ok(())
    }

    /// Largest delay this section can produce.
    pub fn upper_bound_ms(&self) -> u64 {
        match self.mode {
            SlowMode::Random => self.max_ms,
            SlowMode::Fixed => self.fixed_ms,
        }
    }
}

fn default_slow_mode() -> SlowMode {
    SlowMode::Random
}
fn default_delay_ms() -> u64 {
    5000
}
