//! Shared state for the metrics exporter.
//!
//! Built once at startup and handed to the recorder, the GC task and the ops
//! router. Holds the metric families, the identity tracker and the validated
//! config; there are no process-wide singletons.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use rfo_metrics_core::error::Result;
use rfo_metrics_core::{Clock, IdentityTracker, SystemClock};

use crate::config::ExporterConfig;
use crate::gc::SweepReport;
use crate::obs::OperatorMetrics;
use crate::recorder::MetricsRecorder;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<OperatorMetrics>,
    tracker: Arc<IdentityTracker>,
}

struct AppStateInner {
    cfg: ExporterConfig,
    draining: AtomicBool,
    last_sweep: RwLock<Option<SweepReport>>,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle a bad config gracefully (no panic).
    pub fn new(cfg: ExporterConfig) -> Result<Self> {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    /// Same as `new`, with the tracker reading time from `clock`.
    pub fn with_clock(cfg: ExporterConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        cfg.validate()?;

        let metrics = Arc::new(OperatorMetrics::new(
            &cfg.metrics.namespace,
            &cfg.metrics.labels,
        ));
        let tracker = Arc::new(IdentityTracker::with_clock(cfg.metrics.labels.clone(), clock));

        tracing::debug!(
            namespace = %cfg.metrics.namespace,
            gc_interval_secs = cfg.metrics.gc_interval().as_secs(),
            staleness_window_secs = cfg.metrics.staleness_window().as_secs(),
            "metrics state initialised"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                draining: AtomicBool::new(false),
                last_sweep: RwLock::new(None),
            }),
            metrics,
            tracker,
        })
    }

    pub fn cfg(&self) -> &ExporterConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> Arc<OperatorMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn tracker(&self) -> Arc<IdentityTracker> {
        Arc::clone(&self.tracker)
    }

    /// Recorder handle for the control loop.
    pub fn recorder(&self) -> MetricsRecorder {
        MetricsRecorder::new(
            self.metrics(),
            self.tracker(),
            &self.inner.cfg.metrics.custom_resource_kind,
        )
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }

    pub fn last_sweep(&self) -> Option<SweepReport> {
        *self
            .inner
            .last_sweep
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_last_sweep(&self, report: SweepReport) {
        *self
            .inner
            .last_sweep
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(report);
    }
}
