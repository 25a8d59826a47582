// internal
use crate::domain::health::models::HealthCheckFailed;
use crate::domain::health::ports::{HealthRepository, HealthService};
use crate::domain::session::ports::KeyValueStore;

/// structure which implements `HealthService`
#[derive(Debug, Clone)]
pub struct Service<R: HealthRepository, C: KeyValueStore> {
    repo: R,
    cache: C,
}

impl<R: HealthRepository, C: KeyValueStore> Service<R, C> {
    pub fn new(repo: R, cache: C) -> Self {
        Self { repo, cache }
    }
}

impl<R: HealthRepository, C: KeyValueStore> HealthService for Service<R, C> {
    async fn check_database(&self) -> Result<(), HealthCheckFailed> {
        self.repo.check_database().await
    }

    async fn check_cache(&self) -> Result<(), HealthCheckFailed> {
        self.cache
            .ping()
            .await
            .map_err(|e| HealthCheckFailed(e.into()))
    }
}
