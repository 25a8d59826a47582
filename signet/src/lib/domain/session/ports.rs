//! The cache port the session stores are written against.
//!
//! The stores only need a narrow slice of a key-value cache: string values
//! with TTLs and string sets. Keeping the surface this small lets the
//! session semantics (policy, indexes, self-healing) live in the domain and
//! be tested without a running cache server.

use std::future::Future;
use thiserror::Error;

/// Infrastructure failure talking to the cache.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct CacheError(#[from] anyhow::Error);

impl CacheError {
    pub fn new(source: impl Into<anyhow::Error>) -> Self {
        Self(source.into())
    }
}

/// Minimal key-value cache contract. Implemented by the redis adapter in
/// `outbound::redis` and by an in-memory store for tests.
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    /// Reads a string value. Missing keys are `None`, never an error.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, CacheError>> + Send;

    /// Writes a string value with a TTL in seconds (SETEX semantics).
    fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Deletes a key of any type. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Adds a member to a string set.
    fn set_add(
        &self,
        key: &str,
        member: &str,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Removes a member from a string set.
    fn set_remove(
        &self,
        key: &str,
        member: &str,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Lists the members of a string set. Missing sets are empty.
    fn set_members(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Vec<String>, CacheError>> + Send;

    /// Resets a key's TTL in seconds. A no-op for missing keys.
    fn expire(
        &self,
        key: &str,
        ttl_seconds: u64,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Remaining TTL in seconds, or `None` for missing keys and keys
    /// without an expiry.
    fn ttl(&self, key: &str) -> impl Future<Output = Result<Option<u64>, CacheError>> + Send;

    /// Liveness probe for the health surface.
    fn ping(&self) -> impl Future<Output = Result<(), CacheError>> + Send;
}
