#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use obsdemo_server::config::{self, SlowMode};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  listen: "0.0.0.0:8000"
metrics:
  histogram_bucketz: [0.1, 1] # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 3").expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.listen, "0.0.0.0:8000");
    assert!(cfg.metrics.collect_default_metrics);
}

#[test]
fn ok_full_config() {
    let ok = r#"
version: 1
server:
  listen: "127.0.0.1:9000"
app:
  name: "example-nodejs-app"
  display_name: "Observability"
metrics:
  default_labels: { env: "dev" }
  collect_default_metrics: false
  histogram_buckets: [0.05, 0.25, 1]
  summary_quantiles: [0.5, 0.95]
  summary_reservoir: 256
slow:
  mode: fixed
  fixed_ms: 3000
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.server.listen_addr().unwrap().port(), 9000);
    assert_eq!(cfg.slow.mode, SlowMode::Fixed);
    assert_eq!(cfg.slow.upper_bound_ms(), 3000);
    assert_eq!(cfg.metrics.histogram_buckets, vec![0.05, 0.25, 1.0]);
    let labels = cfg.default_labels();
    assert_eq!(labels["app"], "example-nodejs-app");
    assert_eq!(labels["env"], "dev");
}
