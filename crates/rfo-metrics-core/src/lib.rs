//! rfo-metrics core: identity tracking and stale-label computation.
//!
//! This crate owns the runtime-free half of the metrics garbage collector:
//! the identity keys, the label vocabulary and its projections, the stale
//! scanner and the lock-guarded identity tracker. It carries no async runtime
//! or metric-sink dependencies so recorders and tests can use it directly.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Tracking calls never fail their caller; startup problems surface as
//! `MetricsError`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod clock;
pub mod error;
pub mod identity;
pub mod labels;
pub mod scan;
pub mod tracker;

/// Shared result type.
pub use error::{MetricsError, Result};

pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::ResourceIdentity;
pub use labels::{LabelSet, LabelVocabulary, StaleLabels};
pub use tracker::IdentityTracker;
