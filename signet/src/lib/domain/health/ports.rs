//! Port traits for health check operations.

use crate::domain::health::models::HealthCheckFailed;
use std::future::Future;

/// Database port for health check operations.
pub trait HealthRepository: Clone + Send + Sync + 'static {
    /// Checks database connectivity and basic query operations.
    fn check_database(&self) -> impl Future<Output = Result<(), HealthCheckFailed>> + Send;
}

/// Service port for health check business logic.
pub trait HealthService: Clone + Send + Sync + 'static {
    /// Checks relational-store connectivity.
    fn check_database(&self) -> impl Future<Output = Result<(), HealthCheckFailed>> + Send;

    /// Checks session-cache connectivity.
    fn check_cache(&self) -> impl Future<Output = Result<(), HealthCheckFailed>> + Send;
}
