//! rfo-metrics exporter library entry.
//!
//! This crate wires the metric families, the recorder used by the operator's
//! control loop, the stale-metric GC and the ops HTTP surface. It is consumed
//! by the binary (`main.rs`), by an embedding operator, and by integration
//! tests.

pub mod app_state;
pub mod config;
pub mod gc;
pub mod labels;
pub mod obs;
pub mod ops;
pub mod recorder;
pub mod router;

pub use app_state::AppState;
pub use gc::{MetricsGc, SweepReport};
pub use recorder::{MetricsRecorder, NoopRecorder, Recorder};
