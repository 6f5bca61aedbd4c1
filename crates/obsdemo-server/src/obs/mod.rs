//! In-process metrics.
//!
//! Counter/gauge/histogram/summary vectors, a registry that renders them in
//! the Prometheus text format for the `/metrics` handler, the default process
//! collector, and the HTTP request families fed by the timer middleware.

pub mod http;
pub mod metrics;
pub mod process;
pub mod registry;

pub use http::{HttpMetrics, RequestObservation};
pub use registry::{Collector, DefaultLabels, Registry};
