//! In-process metric families and the operator registry.
//!
//! Families are stored as atomics in `DashMap`s and rendered by the `/metrics`
//! handler in Prometheus text format.

pub mod metrics;
pub mod registry;

pub use metrics::{CounterVec, GaugeVec, PartialDelete};
pub use registry::{IdentityShape, OperatorMetrics};
