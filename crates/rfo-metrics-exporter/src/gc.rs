//! Stale metric garbage collection.
//!
//! Label values of the operator's families (namespaces, resource names, pod
//! IPs) come and go with the resources they describe. Series are never
//! removed by the families themselves, so without a sweep every renamed or
//! deleted resource would leave its series behind forever.
//!
//! Each sweep asks the identity tracker for identities not touched within the
//! staleness window and deletes, by partial label match, every series those
//! identities own:
//!
//! - `{namespace, kind, name}` from the Kubernetes-object families,
//! - `{namespace, resource}` from the health-check families,
//! - `{namespace, name}` (narrowed from the previous set) from `cluster_ok`,
//! - `{address}` from the instance-operation family.
//!
//! Removal is eventual: a series can outlive its identity by up to one
//! staleness window plus one sweep interval. A sweep that dies half way keeps
//! its stale sets and the next sweep evicts them again before scanning.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, trace};

use rfo_metrics_core::{LabelSet, StaleLabels};

use crate::app_state::AppState;
use crate::obs::{IdentityShape, OperatorMetrics, PartialDelete};

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub stale_resources: usize,
    pub stale_instances: usize,
    pub deleted_series: usize,
}

fn evict(families: &[&dyn PartialDelete], labels: &LabelSet) -> usize {
    families
        .iter()
        .map(|family| family.delete_partial_match(labels))
        .sum()
}

/// The periodic sweeper. One per `AppState`.
pub struct MetricsGc {
    state: AppState,
    interval: Duration,
    window: Duration,
    extra: Vec<(IdentityShape, Arc<dyn PartialDelete>)>,
    /// Sets of the sweep in progress, cleared once every family was visited.
    pending: Mutex<StaleLabels>,
}

impl MetricsGc {
    pub fn new(state: AppState) -> Self {
        let interval = state.cfg().metrics.gc_interval();
        let window = state.cfg().metrics.staleness_window();
        Self {
            state,
            interval,
            window,
            extra: Vec::new(),
            pending: Mutex::new(StaleLabels::default()),
        }
    }

    /// Also evict from `family`, keyed on `shape`. For families registered
    /// outside `OperatorMetrics`.
    pub fn with_family(mut self, shape: IdentityShape, family: Arc<dyn PartialDelete>) -> Self {
        self.extra.push((shape, family));
        self
    }

    fn families<'a>(
        &'a self,
        metrics: &'a OperatorMetrics,
        shape: IdentityShape,
    ) -> Vec<&'a dyn PartialDelete> {
        let mut out = metrics.families_for(shape);
        for (s, family) in &self.extra {
            if *s == shape {
                out.push(&**family);
            }
        }
        out
    }

    fn replace_pending(&self, stale: StaleLabels) -> StaleLabels {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *pending, stale)
    }

    /// Scan the tracker and evict the series of every stale identity.
    pub fn sweep(&self) -> SweepReport {
        let tracker = self.state.tracker();
        let metrics = self.state.metrics();

        let mut stale = self.replace_pending(StaleLabels::default());
        if !stale.is_empty() {
            debug!(
                event.name = "metrics.gc.sweep_retried",
                identities = stale.len(),
                "retrying eviction left over by an interrupted sweep"
            );
        }
        stale.merge(tracker.scan_stale(self.window));
        // the tracker forgot these identities; keep them until eviction is done
        self.replace_pending(stale.clone());

        let mut deleted = 0;
        let kubernetes = self.families(&metrics, IdentityShape::Kubernetes);
        for labels in &stale.kubernetes {
            deleted += evict(&kubernetes, labels);
        }

        let custom_resource = self.families(&metrics, IdentityShape::CustomResource);
        let narrow = self.families(&metrics, IdentityShape::NarrowName);
        for labels in &stale.custom_resource {
            deleted += evict(&custom_resource, labels);
            if let Some(narrowed) = tracker.vocabulary().narrow_custom_resource(labels) {
                deleted += evict(&narrow, &narrowed);
            }
        }

        let instance = self.families(&metrics, IdentityShape::Instance);
        for labels in &stale.instance {
            deleted += evict(&instance, labels);
        }
        self.replace_pending(StaleLabels::default());

        let report = SweepReport {
            stale_resources: stale.kubernetes.len(),
            stale_instances: stale.instance.len(),
            deleted_series: deleted,
        };

        metrics.gc_sweeps.inc(&[]);
        metrics.gc_deleted_series.add(&[], deleted as u64);
        metrics
            .gc_tracked_identities
            .set(&[("space", "resource")], tracker.tracked_resources() as i64);
        metrics
            .gc_tracked_identities
            .set(&[("space", "instance")], tracker.tracked_instances() as i64);

        if deleted > 0 {
            debug!(
                event.name = "metrics.gc.sweep_completed",
                stale_resources = report.stale_resources,
                stale_instances = report.stale_instances,
                deleted_series = deleted,
                "deleted {deleted} stale metrics"
            );
        } else {
            trace!(
                event.name = "metrics.gc.sweep_completed",
                stale_resources = report.stale_resources,
                stale_instances = report.stale_instances,
                "no stale metrics"
            );
        }

        self.state.set_last_sweep(report);
        report
    }

    /// Sweep every `interval` until `shutdown` fires.
    ///
    /// The first sweep happens one interval after start. A sweep that panics
    /// is logged and the loop carries on with the next tick.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() yields immediately once
        tick.tick().await;

        debug!(
            event.name = "metrics.gc.started",
            interval_secs = self.interval.as_secs(),
            window_secs = self.window.as_secs(),
            "metric GC loop started"
        );

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if catch_unwind(AssertUnwindSafe(|| self.sweep())).is_err() {
                        error!(
                            event.name = "metrics.gc.sweep_panicked",
                            "metric GC sweep panicked; retrying next interval"
                        );
                    }
                }
                _ = shutdown_rx.recv() => {
                    let tracker = self.state.tracker();
                    debug!(
                        event.name = "metrics.gc.shutdown",
                        tracked_resources = tracker.tracked_resources(),
                        tracked_instances = tracker.tracked_instances(),
                        "metric GC loop shutting down"
                    );
                    break;
                }
            }
        }
    }

    /// Start the loop as a background task.
    pub fn spawn(self, shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown_rx))
    }
}
