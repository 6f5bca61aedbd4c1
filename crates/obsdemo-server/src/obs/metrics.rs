//! Metric primitives: counter, gauge, histogram and summary vectors.
//!
//! Every metric declares an ordered list of label names at construction.
//! Observations take label *values* positionally; each distinct value tuple is
//! its own series, stored in a `DashMap` so concurrent requests only contend on
//! a shard. Counters and histograms are plain atomics; gauges keep an `f64` as
//! raw bits in an `AtomicU64`. Histogram sums are kept in microseconds to stay
//! in integer atomics and are rendered in seconds.

use dashmap::DashMap;
use rand::Rng;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use obsdemo_core::error::{ObsDemoError, Result};

use super::registry::{Collector, DefaultLabels};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a sample value the way Prometheus parsers expect.
pub(crate) fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else {
        format!("{v}")
    }
}

fn valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

pub(crate) fn valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Name, help text and declared label names of one metric family.
#[derive(Debug, Clone)]
pub struct Desc {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
}

impl Desc {
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        if !valid_metric_name(name) {
            return Err(ObsDemoError::InvalidName(format!("metric name {name:?}")));
        }
        for (i, l) in label_names.iter().enumerate() {
            if !valid_label_name(l) {
                return Err(ObsDemoError::InvalidName(format!("label name {l:?} on {name}")));
            }
            if label_names[..i].contains(l) {
                return Err(ObsDemoError::InvalidName(format!("duplicate label {l:?} on {name}")));
            }
        }
        Ok(Self {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Build the series key. Missing trailing values become `""`.
    fn key(&self, values: &[&str]) -> Result<Vec<String>> {
        if values.len() > self.label_names.len() {
            return Err(ObsDemoError::InvalidLabels {
                metric: self.name.clone(),
                declared: self.label_names.len(),
                given: values.len(),
            });
        }
        let mut key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        key.resize(self.label_names.len(), String::new());
        Ok(key)
    }

    fn write_header(&self, kind: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", self.name, escape_help(&self.help));
        let _ = writeln!(out, "# TYPE {} {}", self.name, kind);
    }

    /// Render `{a="x",b="y"}` for one series; `extra` carries `le`/`quantile`.
    fn label_str(&self, defaults: &DefaultLabels, key: &[String], extra: Option<(&str, &str)>) -> String {
        let mut parts: Vec<String> = defaults
            .iter()
            .filter(|(k, _)| !self.label_names.iter().any(|n| n == k))
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect();
        parts.extend(
            self.label_names
                .iter()
                .zip(key)
                .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v))),
        );
        if let Some((k, v)) = extra {
            parts.push(format!("{}=\"{}\"", k, escape_label(v)));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("{{{}}}", parts.join(","))
        }
    }

    /// Render a label-less family holding a single sample.
    pub(crate) fn render_scalar(&self, kind: &str, defaults: &DefaultLabels, v: f64, out: &mut String) {
        self.write_header(kind, out);
        let labels = self.label_str(defaults, &[], None);
        let _ = writeln!(out, "{}{} {}", self.name, labels, fmt_value(v));
    }
}

/// Snapshot series in key order so output is stable across scrapes.
fn sorted_keys<V>(map: &DashMap<Vec<String>, V>) -> Vec<Vec<String>> {
    let mut keys: Vec<Vec<String>> = map.iter().map(|r| r.key().clone()).collect();
    keys.sort();
    keys
}

// --------------------
// Counter
// --------------------

/// Monotonic counter vector.
pub struct Counter {
    desc: Desc,
    map: DashMap<Vec<String>, AtomicU64>,
}

impl Counter {
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        Ok(Self { desc: Desc::new(name, help, label_names)?, map: DashMap::new() })
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    /// Increment by 1.
    pub fn inc(&self, values: &[&str]) -> Result<()> {
        self.inc_by(values, 1)
    }

    /// Increment by an arbitrary value.
    pub fn inc_by(&self, values: &[&str], v: u64) -> Result<()> {
        let key = self.desc.key(values)?;
        let counter = self.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
        Ok(())
    }

    /// Current value of one series, `None` if never observed.
    pub fn get(&self, values: &[&str]) -> Option<u64> {
        let key = self.desc.key(values).ok()?;
        self.map.get(&key).map(|c| c.load(Ordering::Relaxed))
    }
}

impl Collector for Counter {
    fn names(&self) -> Vec<String> {
        vec![self.desc.name.clone()]
    }

    fn render(&self, defaults: &DefaultLabels, out: &mut String) {
        self.desc.write_header("counter", out);
        for key in sorted_keys(&self.map) {
            if let Some(val) = self.map.get(&key) {
                let labels = self.desc.label_str(defaults, &key, None);
                let _ = writeln!(out, "{}{} {}", self.desc.name, labels, val.load(Ordering::Relaxed));
            }
        }
    }
}

// --------------------
// Gauge
// --------------------

/// Gauge vector holding `f64` values (stored as bits).
pub struct Gauge {
    desc: Desc,
    map: DashMap<Vec<String>, AtomicU64>,
}

impl Gauge {
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        Ok(Self { desc: Desc::new(name, help, label_names)?, map: DashMap::new() })
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    /// Overwrite the series value.
    pub fn set(&self, values: &[&str], v: f64) -> Result<()> {
        let key = self.desc.key(values)?;
        let gauge = self.map.entry(key).or_insert_with(|| AtomicU64::new(0f64.to_bits()));
        gauge.store(v.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Increment by 1.
    pub fn inc(&self, values: &[&str]) -> Result<()> {
        self.add(values, 1.0)
    }

    /// Decrement by 1.
    pub fn dec(&self, values: &[&str]) -> Result<()> {
        self.add(values, -1.0)
    }

    /// Add an arbitrary signed delta.
    pub fn add(&self, values: &[&str], delta: f64) -> Result<()> {
        let key = self.desc.key(values)?;
        let gauge = self.map.entry(key).or_insert_with(|| AtomicU64::new(0f64.to_bits()));
        let _ = gauge.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            Some((f64::from_bits(bits) + delta).to_bits())
        });
        Ok(())
    }

    pub fn get(&self, values: &[&str]) -> Option<f64> {
        let key = self.desc.key(values).ok()?;
        self.map.get(&key).map(|g| f64::from_bits(g.load(Ordering::Relaxed)))
    }

    /// Start timing; [`GaugeTimer::stop`] sets the series to the elapsed seconds.
    pub fn start_timer(&self, values: &[&str]) -> Result<GaugeTimer<'_>> {
        let key = self.desc.key(values)?;
        Ok(GaugeTimer { gauge: self, key, start: Instant::now() })
    }
}

impl Collector for Gauge {
    fn names(&self) -> Vec<String> {
        vec![self.desc.name.clone()]
    }

    fn render(&self, defaults: &DefaultLabels, out: &mut String) {
        self.desc.write_header("gauge", out);
        for key in sorted_keys(&self.map) {
            if let Some(val) = self.map.get(&key) {
                let labels = self.desc.label_str(defaults, &key, None);
                let v = f64::from_bits(val.load(Ordering::Relaxed));
                let _ = writeln!(out, "{}{} {}", self.desc.name, labels, fmt_value(v));
            }
        }
    }
}

/// In-flight duration timer bound to one gauge series.
pub struct GaugeTimer<'a> {
    gauge: &'a Gauge,
    key: Vec<String>,
    start: Instant,
}

impl GaugeTimer<'_> {
    /// Record the elapsed time and return it in seconds.
    pub fn stop(self) -> f64 {
        let secs = self.start.elapsed().as_secs_f64();
        let gauge = self.gauge.map.entry(self.key).or_insert_with(|| AtomicU64::new(0));
        gauge.store(secs.to_bits(), Ordering::Relaxed);
        secs
    }
}

// --------------------
// Histogram
// --------------------

/// Default buckets in seconds.
pub const DEFAULT_BUCKETS: [f64; 5] = [0.1, 0.5, 1.0, 5.0, 10.0];

struct AtomicHistogram {
    count: AtomicU64,
    sum_micros: AtomicU64,
    buckets: Vec<AtomicU64>,
}

impl AtomicHistogram {
    fn new(n: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_micros: AtomicU64::new(0),
            buckets: (0..n).map(|_| AtomicU64::new(0)).collect(),
        }
    }
}

/// Histogram vector with fixed upper bounds (seconds).
pub struct Histogram {
    desc: Desc,
    bounds: Vec<f64>,
    bounds_micros: Vec<u64>,
    map: DashMap<Vec<String>, AtomicHistogram>,
}

impl Histogram {
    pub fn new(name: &str, help: &str, label_names: &[&str], buckets: &[f64]) -> Result<Self> {
        let desc = Desc::new(name, help, label_names)?;
        if desc.label_names.iter().any(|l| l == "le") {
            return Err(ObsDemoError::InvalidName(format!("label \"le\" is reserved on {name}")));
        }
        validate_buckets(buckets)?;
        Ok(Self {
            desc,
            bounds: buckets.to_vec(),
            bounds_micros: buckets.iter().map(|b| (b * 1_000_000.0).round() as u64).collect(),
            map: DashMap::new(),
        })
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    /// Observe a duration and increment cumulative buckets.
    pub fn observe(&self, values: &[&str], duration: Duration) -> Result<()> {
        let key = self.desc.key(values)?;
        let n = self.bounds.len();
        let hist = self.map.entry(key).or_insert_with(|| AtomicHistogram::new(n));
        let micros = duration.as_micros() as u64;

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum_micros.fetch_add(micros, Ordering::Relaxed);

        // Cumulative: every bucket whose bound is >= the value.
        for (i, &b) in self.bounds_micros.iter().enumerate() {
            if micros <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Observation count of one series.
    pub fn count(&self, values: &[&str]) -> Option<u64> {
        let key = self.desc.key(values).ok()?;
        self.map.get(&key).map(|h| h.count.load(Ordering::Relaxed))
    }

    /// Cumulative count of the bucket with upper bound `le`.
    pub fn bucket(&self, values: &[&str], le: f64) -> Option<u64> {
        let idx = self.bounds.iter().position(|b| *b == le)?;
        let key = self.desc.key(values).ok()?;
        self.map.get(&key).map(|h| h.buckets[idx].load(Ordering::Relaxed))
    }
}

impl Collector for Histogram {
    fn names(&self) -> Vec<String> {
        vec![self.desc.name.clone()]
    }

    fn render(&self, defaults: &DefaultLabels, out: &mut String) {
        let name = &self.desc.name;
        self.desc.write_header("histogram", out);
        for key in sorted_keys(&self.map) {
            let Some(hist) = self.map.get(&key) else { continue };

            for (i, le) in self.bounds.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let labels = self.desc.label_str(defaults, &key, Some(("le", &fmt_value(*le))));
                let _ = writeln!(out, "{name}_bucket{labels} {count}");
            }
            let count = hist.count.load(Ordering::Relaxed);
            let labels = self.desc.label_str(defaults, &key, Some(("le", "+Inf")));
            let _ = writeln!(out, "{name}_bucket{labels} {count}");

            let sum = hist.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
            let labels = self.desc.label_str(defaults, &key, None);
            let _ = writeln!(out, "{name}_sum{labels} {}", fmt_value(sum));
            let _ = writeln!(out, "{name}_count{labels} {count}");
        }
    }
}

pub(crate) fn validate_buckets(buckets: &[f64]) -> Result<()> {
    if buckets.is_empty() {
        return Err(ObsDemoError::BadRequest("histogram buckets must not be empty".into()));
    }
    if buckets.iter().any(|b| !b.is_finite() || *b <= 0.0) {
        return Err(ObsDemoError::BadRequest("histogram buckets must be finite and positive".into()));
    }
    if buckets.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ObsDemoError::BadRequest("histogram buckets must be strictly increasing".into()));
    }
    Ok(())
}

// --------------------
// Summary
// --------------------

/// Default quantiles.
pub const DEFAULT_QUANTILES: [f64; 3] = [0.5, 0.9, 0.99];

/// Default reservoir size per series.
pub const DEFAULT_RESERVOIR: usize = 1024;

#[derive(Default)]
struct SummarySeries {
    count: u64,
    sum: f64,
    samples: Vec<f64>,
}

/// Summary vector. Count and sum are exact; quantiles are estimated from a
/// uniform reservoir sample of all observations (no time decay).
pub struct Summary {
    desc: Desc,
    quantiles: Vec<f64>,
    reservoir: usize,
    map: DashMap<Vec<String>, Mutex<SummarySeries>>,
}

impl Summary {
    pub fn new(
        name: &str,
        help: &str,
        label_names: &[&str],
        quantiles: &[f64],
        reservoir: usize,
    ) -> Result<Self> {
        let desc = Desc::new(name, help, label_names)?;
        if desc.label_names.iter().any(|l| l == "quantile") {
            return Err(ObsDemoError::InvalidName(format!("label \"quantile\" is reserved on {name}")));
        }
        validate_quantiles(quantiles)?;
        if reservoir == 0 {
            return Err(ObsDemoError::BadRequest("summary reservoir must be at least 1".into()));
        }
        Ok(Self { desc, quantiles: quantiles.to_vec(), reservoir, map: DashMap::new() })
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub fn observe(&self, values: &[&str], duration: Duration) -> Result<()> {
        let key = self.desc.key(values)?;
        let v = duration.as_secs_f64();
        let entry = self.map.entry(key).or_default();
        let mut s = entry.lock().unwrap_or_else(|e| e.into_inner());

        s.count += 1;
        s.sum += v;
        if s.samples.len() < self.reservoir {
            s.samples.push(v);
        } else {
            // Algorithm R: keep each of the `count` observations with equal probability.
            let j = rand::thread_rng().gen_range(0..s.count);
            if let Some(slot) = s.samples.get_mut(j as usize) {
                *slot = v;
            }
        }
        Ok(())
    }

    pub fn count(&self, values: &[&str]) -> Option<u64> {
        let key = self.desc.key(values).ok()?;
        let entry = self.map.get(&key)?;
        let s = entry.lock().unwrap_or_else(|e| e.into_inner());
        Some(s.count)
    }

    /// Estimated quantile of one series (seconds).
    pub fn quantile(&self, values: &[&str], q: f64) -> Option<f64> {
        let key = self.desc.key(values).ok()?;
        let entry = self.map.get(&key)?;
        let s = entry.lock().unwrap_or_else(|e| e.into_inner());
        let mut sorted = s.samples.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Some(nearest_rank(&sorted, q))
    }
}

fn nearest_rank(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

impl Collector for Summary {
    fn names(&self) -> Vec<String> {
        vec![self.desc.name.clone()]
    }

    fn render(&self, defaults: &DefaultLabels, out: &mut String) {
        let name = &self.desc.name;
        self.desc.write_header("summary", out);
        for key in sorted_keys(&self.map) {
            let Some(entry) = self.map.get(&key) else { continue };
            let (count, sum, mut sorted) = {
                let s = entry.lock().unwrap_or_else(|e| e.into_inner());
                (s.count, s.sum, s.samples.clone())
            };
            sorted.sort_by(|a, b| a.total_cmp(b));

            for q in &self.quantiles {
                let labels = self.desc.label_str(defaults, &key, Some(("quantile", &fmt_value(*q))));
                let _ = writeln!(out, "{name}{labels} {}", fmt_value(nearest_rank(&sorted, *q)));
            }
            let labels = self.desc.label_str(defaults, &key, None);
            let _ = writeln!(out, "{name}_sum{labels} {}", fmt_value(sum));
            let _ = writeln!(out, "{name}_count{labels} {count}");
        }
    }
}

pub(crate) fn validate_quantiles(quantiles: &[f64]) -> Result<()> {
    if quantiles.iter().any(|q| !(*q > 0.0 && *q <= 1.0)) {
        return Err(ObsDemoError::BadRequest("summary quantiles must be in (0, 1]".into()));
    }
    Ok(())
}
