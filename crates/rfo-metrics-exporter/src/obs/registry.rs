//! The operator's metric families and how stale identities map onto them.

use rfo_metrics_core::LabelVocabulary;

use super::metrics::{CounterVec, GaugeVec, PartialDelete};

const CONTROLLER_SUBSYSTEM: &str = "controller";
const GC_SUBSYSTEM: &str = "metrics_gc";

/// The label vocabulary a family keys its identity on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityShape {
    /// `{namespace, kind, name}`
    Kubernetes,
    /// `{namespace, resource}`
    CustomResource,
    /// `{namespace, name}`, derived from a custom-resource set.
    NarrowName,
    /// `{address}`
    Instance,
}

pub struct OperatorMetrics {
    /// Whether a failover cluster is healthy (1) or not (0).
    pub cluster_ok: GaugeVec,
    pub ensure_resource: CounterVec,
    pub redis_checks: CounterVec,
    pub sentinel_checks: CounterVec,
    pub k8s_operations: CounterVec,
    pub redis_operations: CounterVec,

    pub gc_sweeps: CounterVec,
    pub gc_deleted_series: CounterVec,
    pub gc_tracked_identities: GaugeVec,
}

impl OperatorMetrics {
    /// Build the families with names prefixed by `namespace` and identity
    /// labels taken from `vocab`.
    pub fn new(namespace: &str, vocab: &LabelVocabulary) -> Self {
        let controller = |name: &str| format!("{namespace}_{CONTROLLER_SUBSYSTEM}_{name}");
        let gc = |name: &str| format!("{namespace}_{GC_SUBSYSTEM}_{name}");
        let ns = vocab.namespace.as_str();
        let (kind, name) = (vocab.kind.as_str(), vocab.name.as_str());
        let (resource, address) = (vocab.resource.as_str(), vocab.address.as_str());
        let check_labels = [ns, resource, "indicator", "instance", "status"];

        Self {
            cluster_ok: GaugeVec::new(
                controller("cluster_ok"),
                "Number of failover clusters managed by the operator.",
                &[ns, name],
            ),
            ensure_resource: CounterVec::new(
                controller("ensure_resource_total"),
                "number of 'ensure' operations on a resource performed by the controller.",
                &[ns, name, kind, "resource_name", "status"],
            ),
            redis_checks: CounterVec::new(
                controller("redis_checks_total"),
                "indicates any error encountered in managed redis instance(s)",
                &check_labels,
            ),
            sentinel_checks: CounterVec::new(
                controller("sentinel_checks_total"),
                "indicates any error encountered in managed sentinel instance(s)",
                &check_labels,
            ),
            k8s_operations: CounterVec::new(
                controller("k8s_operations_total"),
                "number of operations performed on k8s",
                &[ns, kind, name, "operation", "status", "err"],
            ),
            redis_operations: CounterVec::new(
                controller("redis_operations_total"),
                "number of operations performed on redis",
                &["kind", address, "operation", "status", "err"],
            ),
            gc_sweeps: CounterVec::new(
                gc("sweeps_total"),
                "number of completed metric GC sweeps",
                &[],
            ),
            gc_deleted_series: CounterVec::new(
                gc("deleted_series_total"),
                "number of stale series removed by the metric GC",
                &[],
            ),
            gc_tracked_identities: GaugeVec::new(
                gc("tracked_identities"),
                "identities currently tracked for staleness",
                &["space"],
            ),
        }
    }

    /// Families whose series are keyed on `shape`.
    pub fn families_for(&self, shape: IdentityShape) -> Vec<&dyn PartialDelete> {
        match shape {
            IdentityShape::Kubernetes => vec![
                &self.ensure_resource as &dyn PartialDelete,
                &self.k8s_operations,
            ],
            IdentityShape::CustomResource => vec![
                &self.redis_checks as &dyn PartialDelete,
                &self.sentinel_checks,
            ],
            IdentityShape::NarrowName => vec![&self.cluster_ok as &dyn PartialDelete],
            IdentityShape::Instance => vec![&self.redis_operations as &dyn PartialDelete],
        }
    }

    /// Render all families in Prometheus text format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.cluster_ok.render(&mut out);
        self.ensure_resource.render(&mut out);
        self.redis_checks.render(&mut out);
        self.sentinel_checks.render(&mut out);
        self.k8s_operations.render(&mut out);
        self.redis_operations.render(&mut out);
        self.gc_sweeps.render(&mut out);
        self.gc_deleted_series.render(&mut out);
        self.gc_tracked_identities.render(&mut out);
        out
    }
}
