use std::time::Duration;

use serde::Deserialize;
use rfo_metrics_core::error::{MetricsError, Result};
use rfo_metrics_core::LabelVocabulary;

use crate::recorder::RESERVED_LABELS;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            metrics: MetricsSection::default(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::UnsupportedVersion);
        }

        self.metrics.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Metric name prefix.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_gc_interval_secs")]
    pub gc_interval_secs: u64,

    /// Falls back to `gc_interval_secs` when unset.
    #[serde(default)]
    pub staleness_window_secs: Option<u64>,

    #[serde(default)]
    pub labels: LabelVocabulary,

    /// Kind the health-check recorders track their custom resource under.
    #[serde(default = "default_custom_resource_kind")]
    pub custom_resource_kind: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            listen: default_listen(),
            gc_interval_secs: default_gc_interval_secs(),
            staleness_window_secs: None,
            labels: LabelVocabulary::default(),
            custom_resource_kind: default_custom_resource_kind(),
        }
    }
}

/// Upper bound for the sweep interval and the staleness window (one day).
pub const MAX_PERIOD_SECS: u64 = 86_400;

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if !rfo_metrics_core::labels::is_label_name(&self.namespace) {
            return Err(MetricsError::BadConfig(format!(
                "metrics.namespace is not a valid metric name prefix: {:?}",
                self.namespace
            )));
        }
        if !(1..=MAX_PERIOD_SECS).contains(&self.gc_interval_secs) {
            return Err(MetricsError::BadConfig(format!(
                "metrics.gc_interval_secs must be between 1 and {MAX_PERIOD_SECS}"
            )));
        }
        if let Some(window) = self.staleness_window_secs {
            if !(1..=MAX_PERIOD_SECS).contains(&window) {
                return Err(MetricsError::BadConfig(format!(
                    "metrics.staleness_window_secs must be between 1 and {MAX_PERIOD_SECS}"
                )));
            }
        }
        if self.custom_resource_kind.is_empty() {
            return Err(MetricsError::BadConfig(
                "metrics.custom_resource_kind must not be empty".into(),
            ));
        }
        self.labels.validate()?;

        // identity labels share families with the recorder's fixed labels
        let v = &self.labels;
        for (field, value) in [
            ("namespace", &v.namespace),
            ("kind", &v.kind),
            ("name", &v.name),
            ("resource", &v.resource),
            ("address", &v.address),
        ] {
            let own_kind = field == "kind" && value == "kind";
            if RESERVED_LABELS.contains(&value.as_str()) && !own_kind {
                return Err(MetricsError::BadConfig(format!(
                    "labels.{field} collides with a reserved label: {value:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs)
    }

    pub fn staleness_window(&self) -> Duration {
        Duration::from_secs(self.staleness_window_secs.unwrap_or(self.gc_interval_secs))
    }
}

fn default_namespace() -> String {
    "redis_operator".into()
}
fn default_listen() -> String {
    "0.0.0.0:9710".into()
}
fn default_gc_interval_secs() -> u64 {
    300
}
fn default_custom_resource_kind() -> String {
    "redisfailover".into()
}
