//! Top-level facade crate for rfo-metrics.
//!
//! Re-exports the tracker primitives and the exporter so operators can depend
//! on a single crate.

pub mod core {
    pub use rfo_metrics_core::*;
}

pub mod exporter {
    pub use rfo_metrics_exporter::*;
}
