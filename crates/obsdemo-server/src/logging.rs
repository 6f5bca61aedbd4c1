//! Tracing setup.
//!
//! One registry, two fmt layers: compact text for the access log and
//! lifecycle events, flattened JSON for events on [`APP_LOG_TARGET`].

use tracing::Subscriber;
use tracing_subscriber::{
    filter::filter_fn, fmt, fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Target of application log lines (emitted as JSON).
pub const APP_LOG_TARGET: &str = "obsdemo::app";

/// Target of the per-request access log.
pub const ACCESS_LOG_TARGET: &str = "obsdemo::access";

/// Install the global subscriber writing to stdout (`RUST_LOG`, default `info`).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    subscriber(filter, std::io::stdout).init();
}

/// Build the layered subscriber; both layers share `writer`.
pub fn subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Clone + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_writer(writer.clone())
                .with_filter(filter_fn(|meta| meta.target() != APP_LOG_TARGET)),
        )
        .with(
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_writer(writer)
                .with_filter(filter_fn(|meta| meta.target() == APP_LOG_TARGET)),
        )
}
