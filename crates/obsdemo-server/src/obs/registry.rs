//! Metrics registry.
//!
//! Holds collectors in registration order and renders them in the Prometheus
//! text exposition format. A registry is an ordinary value: the server builds
//! one at startup and hands it to the router through `AppState`, and every
//! test can build its own.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use obsdemo_core::error::{ObsDemoError, Result};

use super::metrics::valid_label_name;

/// Anything that can contribute metric families to a scrape.
pub trait Collector: Send + Sync {
    /// Metric family names owned by this collector.
    fn names(&self) -> Vec<String>;
    /// Append `# HELP`/`# TYPE` and sample lines for every owned family.
    fn render(&self, defaults: &DefaultLabels, out: &mut String);
}

/// Labels attached to every exported series, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultLabels(Vec<(String, String)>);

impl DefaultLabels {
    pub fn new(labels: BTreeMap<String, String>) -> Result<Self> {
        for k in labels.keys() {
            if !valid_label_name(k) {
                return Err(ObsDemoError::InvalidName(format!("default label {k:?}")));
            }
        }
        Ok(Self(labels.into_iter().collect()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.0.iter()
    }
}

#[derive(Default)]
pub struct Registry {
    collectors: RwLock<Vec<Arc<dyn Collector>>>,
    defaults: DefaultLabels,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_labels(defaults: DefaultLabels) -> Self {
        Self {
            collectors: RwLock::new(Vec::new()),
            defaults,
        }
    }

    /// Add a collector. Fails if any of its family names is already taken.
    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let mut collectors = self.collectors.write().unwrap_or_else(|e| e.into_inner());
        let incoming = collector.names();

        for (i, name) in incoming.iter().enumerate() {
            let taken = incoming[..i].contains(name)
                || collectors.iter().any(|c| c.names().contains(name));
            if taken {
                return Err(ObsDemoError::AlreadyRegistered(name.clone()));
            }
        }

        tracing::debug!(metrics = ?incoming, "collector registered");
        collectors.push(collector);
        Ok(())
    }

    /// Registered family names in registration order.
    pub fn metric_names(&self) -> Vec<String> {
        let collectors = self.collectors.read().unwrap_or_else(|e| e.into_inner());
        collectors.iter().flat_map(|c| c.names()).collect()
    }

    /// Render every registered family in exposition format.
    pub fn render(&self) -> String {
        let collectors: Vec<Arc<dyn Collector>> = self
            .collectors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let mut out = String::new();
        for c in collectors {
            c.render(&self.defaults, &mut out);
        }
        out
    }
}
