//! Server config loader (strict parsing).
//!
//! The YAML file is optional: when it does not exist the defaults apply.
//! Environment overrides (`PORT`, `APP_NAME`) are applied after parsing.

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use obsdemo_core::error::{ObsDemoError, Result};

pub use schema::{AppConfig, AppSection, MetricsSection, ServerSection, SlowMode, SlowSection};

/// Env var naming the config file.
pub const CONFIG_PATH_ENV: &str = "OBSDEMO_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "obsdemo.yaml";

/// Resolve the config path from the environment, load it, apply overrides.
pub fn load_from_env() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut cfg = load_from_file_or_default(&path)?;
    cfg.apply_env(|k| std::env::var(k).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_file_or_default(path: &str) -> Result<AppConfig> {
    match fs::read_to_string(path) {
        Ok(s) => load_from_str(&s),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(%path, "config file not found, using defaults");
            Ok(AppConfig::default())
        }
        Err(e) => Err(ObsDemoError::Internal(format!("read config failed: {e}"))),
    }
}

pub fn load_from_str(s: &str) -> Result<AppConfig> {
    let cfg: AppConfig = serde_yaml::from_str(s)
        .map_err(|e| ObsDemoError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn defaults_listen_on_8000() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.server.listen, "0.0.0.0:8000");
        assert_eq!(cfg.slow.mode, SlowMode::Random);
        assert_eq!(cfg.metrics.histogram_buckets, vec![0.1, 0.5, 1.0, 5.0, 10.0]);
    }

    #[test]
    fn env_overrides_port_and_name() {
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| match k {
            "PORT" => Some("9100".into()),
            "APP_NAME" => Some("shop".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.server.listen, "0.0.0.0:9100");
        assert_eq!(cfg.app.name, "shop");
        assert_eq!(cfg.default_labels().get("app").map(String::as_str), Some("shop"));
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut cfg = AppConfig::default();
        let err = cfg.apply_env(|k| (k == "PORT").then(|| "http".to_string())).unwrap_err();
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    }

    #[test]
    fn explicit_app_label_wins() {
        let cfg = load_from_str(
            r#"
version: 1
metrics:
  default_labels: { app: "pinned", team: "obs" }
"#,
        )
        .unwrap();
        let labels = cfg.default_labels();
        assert_eq!(labels["app"], "pinned");
        assert_eq!(labels["team"], "obs");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_from_file_or_default("/definitely/not/here/obsdemo.yaml").unwrap();
        assert_eq!(cfg.version, 1);
    }

    #[test]
    fn rejects_invalid_values() {
        for bad in [
            "version: 2",
            "version: 1\nserver: { listen: \"nope\" }",
            "version: 1\nmetrics: { histogram_buckets: [1, 0.5] }",
            "version: 1\nmetrics: { summary_quantiles: [0.5, 1.5] }",
            "version: 1\nslow: { mode: fixed, fixed_ms: 600000 }",
            "version: 1\nslow: { mode: sometimes }",
        ] {
            assert!(load_from_str(bad).is_err(), "should reject: {bad}");
        }
    }
}
