#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use rfo_metrics_core::ManualClock;
use rfo_metrics_exporter::config::ExporterConfig;
use rfo_metrics_exporter::labels::{
    CheckIndicator, HealthStatus, InstanceKind, RedisOperation, Status,
};
use rfo_metrics_exporter::{AppState, MetricsGc, Recorder, SweepReport};

const INTERVAL: Duration = Duration::from_secs(300);

fn state() -> (AppState, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let state = AppState::with_clock(ExporterConfig::default(), clock.clone()).unwrap();
    (state, clock)
}

#[tokio::test(start_paused = true)]
async fn loop_evicts_after_one_interval() {
    let (state, clock) = state();
    let r = state.recorder();
    r.record_redis_check(
        "ns1",
        "rf1",
        CheckIndicator::NoMaster,
        "10.0.0.5",
        HealthStatus::Unhealthy,
    );
    r.set_cluster_error("ns1", "rf1");
    r.record_redis_operation(
        InstanceKind::Redis,
        "10.0.0.5",
        RedisOperation::MakeMaster,
        Status::Fail,
        "CONNECTION_TIMEDOUT",
    );
    clock.advance(Duration::from_secs(360));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = MetricsGc::new(state.clone()).spawn(shutdown_rx);

    // before the first tick nothing has run
    tokio::time::sleep(INTERVAL - Duration::from_secs(1)).await;
    assert!(state.last_sweep().is_none());
    assert_eq!(state.metrics().redis_checks.len(), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let report = state.last_sweep().expect("one sweep ran");
    assert_eq!(report.stale_resources, 1);
    assert_eq!(report.stale_instances, 1);
    assert_eq!(report.deleted_series, 3);

    let m = state.metrics();
    assert!(m.redis_checks.is_empty());
    assert!(m.cluster_ok.is_empty());
    assert!(m.redis_operations.is_empty());

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("gc loop should exit within 1 second")
        .expect("gc loop task should not panic");
}

#[tokio::test(start_paused = true)]
async fn loop_keeps_sweeping_every_interval() {
    let (state, _clock) = state();
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let _handle = MetricsGc::new(state.clone()).spawn(shutdown_rx);

    tokio::time::sleep(INTERVAL * 3 + Duration::from_secs(1)).await;
    assert_eq!(state.metrics().gc_sweeps.get(&[]), Some(3));
}

#[tokio::test(start_paused = true)]
async fn loop_exits_when_sender_dropped() {
    let (state, _clock) = state();
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let handle = MetricsGc::new(state).spawn(shutdown_rx);
    drop(shutdown_tx);

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("gc loop should exit")
        .expect("gc loop task should not panic");
}

#[test]
fn readded_identity_starts_a_new_window() {
    let (state, clock) = state();
    let r = state.recorder();
    let gc = MetricsGc::new(state.clone());

    r.record_k8s_operation("ns1", "StatefulSet", "rfr-rf1", "UPDATE", Status::Success, "NA");
    clock.advance(Duration::from_secs(301));
    assert_eq!(gc.sweep().deleted_series, 1);

    // no double free
    assert_eq!(gc.sweep(), SweepReport::default());

    r.record_k8s_operation("ns1", "StatefulSet", "rfr-rf1", "UPDATE", Status::Success, "NA");
    clock.advance(Duration::from_secs(300));
    assert_eq!(gc.sweep().deleted_series, 0);
    assert_eq!(state.metrics().k8s_operations.len(), 1);
    clock.advance(Duration::from_secs(1));
    assert_eq!(gc.sweep().deleted_series, 1);
}

#[test]
fn custom_vocabulary_flows_through_record_and_evict() {
    let cfg = config_with_vocabulary();
    let clock = Arc::new(ManualClock::new());
    let state = AppState::with_clock(cfg, clock.clone()).unwrap();
    let r = state.recorder();

    r.record_redis_operation(
        InstanceKind::Sentinel,
        "10.0.0.8",
        RedisOperation::CheckSentinelQuorum,
        Status::Success,
        "NA",
    );
    r.record_sentinel_check(
        "ns1",
        "rf1",
        CheckIndicator::SentinelNotReady,
        "10.0.0.8",
        HealthStatus::Healthy,
    );
    r.set_cluster_ok("ns1", "rf1");
    assert!(state.tracker().is_resource_tracked("ns1", "rfo", "rf1"));

    let out = state.metrics().render();
    assert!(out.contains("addr=\"10.0.0.8\""));
    assert!(out.contains("cr=\"rf1\""));

    clock.advance(Duration::from_secs(301));
    let report = MetricsGc::new(state.clone()).sweep();
    assert_eq!(report.deleted_series, 3);
}

fn config_with_vocabulary() -> ExporterConfig {
    rfo_metrics_exporter::config::load_from_str(
        r#"
version: 1
metrics:
  namespace: rfo
  labels:
    resource: cr
    address: addr
  custom_resource_kind: rfo
"#,
    )
    .unwrap()
}
