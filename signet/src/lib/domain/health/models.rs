use thiserror::Error;

/// Error returned when a health check fails.
///
/// Wraps the underlying error (database or cache connection failure).
#[derive(Debug, Error)]
#[error("failed health check: {0}")]
pub struct HealthCheckFailed(pub anyhow::Error);
