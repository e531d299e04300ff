//! Exporter config loader (strict parsing).

pub mod schema;

use std::fs;

use rfo_metrics_core::error::{MetricsError, Result};

pub use schema::{ExporterConfig, MetricsSection};

/// Environment variable overriding the config path.
pub const CONFIG_PATH_ENV: &str = "RFO_METRICS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "rfo-metrics.yaml";

pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

pub fn load_from_file(path: &str) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MetricsError::Io(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| MetricsError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
