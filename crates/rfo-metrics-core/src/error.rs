//! Shared error type across rfo-metrics crates.
//!
//! Recording and garbage collection never return errors; this type only covers
//! startup (configuration, binding the ops listener).

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("io: {0}")]
    Io(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricsError {
    /// Stable short code, used in logs and tests.
    pub fn code(&self) -> &'static str {
        match self {
            MetricsError::BadConfig(_) => "BAD_CONFIG",
            MetricsError::UnsupportedVersion => "UNSUPPORTED_VERSION",
            MetricsError::Io(_) => "IO",
            MetricsError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<std::io::Error> for MetricsError {
    fn from(e: std::io::Error) -> Self {
        MetricsError::Io(e.to_string())
    }
}
