//! Recording API used by the operator's control loop.
//!
//! Every call updates one metric family and touches the identity the series
//! belongs to; recording is the only liveness signal the GC sees. Calls never
//! fail and never block beyond lock contention.

use std::sync::Arc;

use rfo_metrics_core::IdentityTracker;

use crate::labels::{
    CheckIndicator, HealthStatus, InstanceKind, K8sErrorKind, RedisErrorKind, RedisOperation,
    Status, NOT_APPLICABLE,
};
use crate::obs::{CounterVec, OperatorMetrics};

/// Fixed (non-identity) label names of the operator families. The configured
/// identity vocabulary must not reuse them.
pub const RESERVED_LABELS: [&str; 7] = [
    "resource_name",
    "indicator",
    "instance",
    "status",
    "operation",
    "err",
    "kind",
];

pub trait Recorder: Send + Sync {
    fn set_cluster_ok(&self, namespace: &str, name: &str);
    fn set_cluster_error(&self, namespace: &str, name: &str);
    fn delete_cluster(&self, namespace: &str, name: &str);

    fn record_ensure_operation(
        &self,
        object_namespace: &str,
        object_name: &str,
        object_kind: &str,
        resource_name: &str,
        status: Status,
    );

    fn record_redis_check(
        &self,
        namespace: &str,
        resource: &str,
        indicator: CheckIndicator,
        instance: &str,
        status: HealthStatus,
    );

    fn record_sentinel_check(
        &self,
        namespace: &str,
        resource: &str,
        indicator: CheckIndicator,
        instance: &str,
        status: HealthStatus,
    );

    fn record_k8s_operation(
        &self,
        namespace: &str,
        kind: &str,
        name: &str,
        operation: &str,
        status: Status,
        err: &str,
    );

    fn record_redis_operation(
        &self,
        kind: InstanceKind,
        address: &str,
        operation: RedisOperation,
        status: Status,
        err: &str,
    );

    /// Record the outcome of an orchestration API call.
    fn record_k8s_result(
        &self,
        namespace: &str,
        kind: &str,
        name: &str,
        operation: &str,
        result: std::result::Result<(), K8sErrorKind>,
    ) {
        let (status, err) = match result {
            Ok(()) => (Status::Success, NOT_APPLICABLE),
            Err(e) => (Status::Fail, e.as_str()),
        };
        self.record_k8s_operation(namespace, kind, name, operation, status, err);
    }

    /// Record the outcome of a command against a redis/sentinel instance.
    fn record_redis_result(
        &self,
        kind: InstanceKind,
        address: &str,
        operation: RedisOperation,
        result: std::result::Result<(), RedisErrorKind>,
    ) {
        let (status, err) = match result {
            Ok(()) => (Status::Success, NOT_APPLICABLE),
            Err(e) => (Status::Fail, e.as_str()),
        };
        self.record_redis_operation(kind, address, operation, status, err);
    }
}

/// Recorder backed by the exporter's families and identity tracker.
#[derive(Clone)]
pub struct MetricsRecorder {
    metrics: Arc<OperatorMetrics>,
    tracker: Arc<IdentityTracker>,
    custom_resource_kind: String,
}

impl MetricsRecorder {
    pub fn new(
        metrics: Arc<OperatorMetrics>,
        tracker: Arc<IdentityTracker>,
        custom_resource_kind: &str,
    ) -> Self {
        Self {
            metrics,
            tracker,
            custom_resource_kind: custom_resource_kind.to_string(),
        }
    }

    fn record_check(
        &self,
        family: &CounterVec,
        namespace: &str,
        resource: &str,
        indicator: CheckIndicator,
        instance: &str,
        status: HealthStatus,
    ) {
        let v = self.tracker.vocabulary();
        family.inc(&[
            (v.namespace.as_str(), namespace),
            (v.resource.as_str(), resource),
            ("indicator", indicator.as_str()),
            ("instance", instance),
            ("status", status.as_str()),
        ]);
        self.tracker
            .touch_resource(namespace, &self.custom_resource_kind, resource);
    }
}

impl Recorder for MetricsRecorder {
    fn set_cluster_ok(&self, namespace: &str, name: &str) {
        let v = self.tracker.vocabulary();
        self.metrics
            .cluster_ok
            .set(&[(v.namespace.as_str(), namespace), (v.name.as_str(), name)], 1);
    }

    fn set_cluster_error(&self, namespace: &str, name: &str) {
        let v = self.tracker.vocabulary();
        self.metrics
            .cluster_ok
            .set(&[(v.namespace.as_str(), namespace), (v.name.as_str(), name)], 0);
    }

    fn delete_cluster(&self, namespace: &str, name: &str) {
        let v = self.tracker.vocabulary();
        self.metrics
            .cluster_ok
            .delete(&[(v.namespace.as_str(), namespace), (v.name.as_str(), name)]);
    }

    fn record_ensure_operation(
        &self,
        object_namespace: &str,
        object_name: &str,
        object_kind: &str,
        resource_name: &str,
        status: Status,
    ) {
        let v = self.tracker.vocabulary();
        self.metrics.ensure_resource.inc(&[
            (v.namespace.as_str(), object_namespace),
            (v.name.as_str(), object_name),
            (v.kind.as_str(), object_kind),
            ("resource_name", resource_name),
            ("status", status.as_str()),
        ]);
        self.tracker
            .touch_resource(object_namespace, object_kind, object_name);
    }

    fn record_redis_check(
        &self,
        namespace: &str,
        resource: &str,
        indicator: CheckIndicator,
        instance: &str,
        status: HealthStatus,
    ) {
        let family = &self.metrics.redis_checks;
        self.record_check(family, namespace, resource, indicator, instance, status);
    }

    fn record_sentinel_check(
        &self,
        namespace: &str,
        resource: &str,
        indicator: CheckIndicator,
        instance: &str,
        status: HealthStatus,
    ) {
        let family = &self.metrics.sentinel_checks;
        self.record_check(family, namespace, resource, indicator, instance, status);
    }

    fn record_k8s_operation(
        &self,
        namespace: &str,
        kind: &str,
        name: &str,
        operation: &str,
        status: Status,
        err: &str,
    ) {
        let v = self.tracker.vocabulary();
        self.metrics.k8s_operations.inc(&[
            (v.namespace.as_str(), namespace),
            (v.kind.as_str(), kind),
            (v.name.as_str(), name),
            ("operation", operation),
            ("status", status.as_str()),
            ("err", err),
        ]);
        self.tracker.touch_resource(namespace, kind, name);
    }

    fn record_redis_operation(
        &self,
        kind: InstanceKind,
        address: &str,
        operation: RedisOperation,
        status: Status,
        err: &str,
    ) {
        let v = self.tracker.vocabulary();
        self.metrics.redis_operations.inc(&[
            ("kind", kind.as_str()),
            (v.address.as_str(), address),
            ("operation", operation.as_str()),
            ("status", status.as_str()),
            ("err", err),
        ]);
        self.tracker.touch_instance(address);
    }
}

/// Recorder that drops everything. Stands in when no metric sink is wired
/// (tests of collaborators, metrics disabled).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn set_cluster_ok(&self, _namespace: &str, _name: &str) {}
    fn set_cluster_error(&self, _namespace: &str, _name: &str) {}
    fn delete_cluster(&self, _namespace: &str, _name: &str) {}

    fn record_ensure_operation(&self, _: &str, _: &str, _: &str, _: &str, _: Status) {}

    fn record_redis_check(&self, _: &str, _: &str, _: CheckIndicator, _: &str, _: HealthStatus) {}

    fn record_sentinel_check(&self, _: &str, _: &str, _: CheckIndicator, _: &str, _: HealthStatus) {
    }

    fn record_k8s_operation(&self, _: &str, _: &str, _: &str, _: &str, _: Status, _: &str) {}

    fn record_redis_operation(
        &self,
        _: InstanceKind,
        _: &str,
        _: RedisOperation,
        _: Status,
        _: &str,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfo_metrics_core::LabelVocabulary;

    fn recorder() -> (MetricsRecorder, Arc<OperatorMetrics>, Arc<IdentityTracker>) {
        let vocab = LabelVocabulary::default();
        let metrics = Arc::new(OperatorMetrics::new("t", &vocab));
        let tracker = Arc::new(IdentityTracker::new(vocab));
        let r = MetricsRecorder::new(metrics.clone(), tracker.clone(), "redisfailover");
        (r, metrics, tracker)
    }

    #[test]
    fn every_record_touches_its_identity() {
        let (r, _, tracker) = recorder();
        r.record_ensure_operation("ns1", "rf1", "redisfailover", "rfr-rf1", Status::Success);
        r.record_k8s_operation("ns1", "Pod", "rfr-rf1-0", "GET", Status::Success, NOT_APPLICABLE);
        r.record_sentinel_check(
            "ns2",
            "rf2",
            CheckIndicator::SentinelNotReady,
            "10.0.0.9",
            HealthStatus::Unhealthy,
        );
        r.record_redis_operation(
            InstanceKind::Redis,
            "10.0.0.5",
            RedisOperation::IsMaster,
            Status::Success,
            NOT_APPLICABLE,
        );

        assert!(tracker.is_resource_tracked("ns1", "redisfailover", "rf1"));
        assert!(tracker.is_resource_tracked("ns1", "Pod", "rfr-rf1-0"));
        assert!(tracker.is_resource_tracked("ns2", "redisfailover", "rf2"));
        assert!(tracker.is_instance_tracked("10.0.0.5"));
        assert_eq!(tracker.tracked_resources(), 3);
    }

    #[test]
    fn cluster_gauge_is_not_an_activity_signal() {
        let (r, metrics, tracker) = recorder();
        r.set_cluster_ok("ns1", "rf1");
        assert_eq!(metrics.cluster_ok.get(&[("namespace", "ns1"), ("name", "rf1")]), Some(1));
        r.set_cluster_error("ns1", "rf1");
        assert_eq!(metrics.cluster_ok.get(&[("namespace", "ns1"), ("name", "rf1")]), Some(0));
        r.delete_cluster("ns1", "rf1");
        assert!(metrics.cluster_ok.is_empty());
        assert_eq!(tracker.tracked_resources(), 0);
    }

    #[test]
    fn results_map_to_status_and_err() {
        let (r, metrics, _) = recorder();
        r.record_k8s_result("ns1", "Secret", "s1", "GET", Err(K8sErrorKind::NotFound));
        r.record_k8s_result("ns1", "Secret", "s1", "GET", Ok(()));
        r.record_redis_result(
            InstanceKind::Sentinel,
            "10.0.0.6",
            RedisOperation::ResetSentinel,
            Err(RedisErrorKind::classify("dial tcp: connection refused")),
        );

        let base = [("namespace", "ns1"), ("kind", "Secret"), ("name", "s1"), ("operation", "GET")];
        let fail: Vec<_> = base
            .iter()
            .copied()
            .chain([("status", "FAIL"), ("err", "RESOURCE_NOT_FOUND")])
            .collect();
        let ok: Vec<_> = base
            .iter()
            .copied()
            .chain([("status", "SUCCESS"), ("err", "NA")])
            .collect();
        assert_eq!(metrics.k8s_operations.get(&fail), Some(1));
        assert_eq!(metrics.k8s_operations.get(&ok), Some(1));
        assert_eq!(
            metrics.redis_operations.get(&[
                ("kind", "SENTINEL"),
                ("IP", "10.0.0.6"),
                ("operation", "RESET_ALL_SENTINEL_CONFIG"),
                ("status", "FAIL"),
                ("err", "CONNECTION_REFUSED"),
            ]),
            Some(1)
        );
    }

    #[test]
    fn noop_recorder_is_a_recorder() {
        let r: Box<dyn Recorder> = Box::new(NoopRecorder);
        r.record_k8s_result("ns", "Pod", "p", "DELETE", Ok(()));
        r.set_cluster_ok("ns", "rf");
    }
}
