//! In-memory [`KeyValueStore`] used by the session-plane tests.
//!
//! Mirrors the slice of cache behavior the stores rely on: string values,
//! string sets, DEL across types, EXPIRE only touching existing keys.
//! TTLs are recorded but never enforced; expiry-dependent behavior is
//! exercised by deleting keys directly.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::domain::session::ports::{CacheError, KeyValueStore};

#[derive(Debug, Default)]
struct Inner {
    strings: HashMap<String, String>,
    sets: HashMap<String, HashSet<String>>,
    ttls: HashMap<String, u64>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Test helper: every live key (string or set) starting with `prefix`.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let inner = self.lock();
        inner
            .strings
            .keys()
            .chain(inner.sets.keys())
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Test helper: overwrite a key's recorded TTL.
    pub fn force_ttl(&self, key: &str, ttl_seconds: u64) {
        self.lock().ttls.insert(key.to_string(), ttl_seconds);
    }
}

impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.lock().strings.get(key).cloned())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut inner = self.lock();
        inner.strings.insert(key.to_string(), value.to_string());
        inner.ttls.insert(key.to_string(), ttl_seconds);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut inner = self.lock();
        inner.strings.remove(key);
        inner.sets.remove(key);
        inner.ttls.remove(key);
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), CacheError> {
        self.lock()
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError> {
        let mut inner = self.lock();
        let emptied = inner.sets.get_mut(key).map(|set| {
            set.remove(member);
            set.is_empty()
        });
        if emptied == Some(true) {
            inner.sets.remove(key);
            inner.ttls.remove(key);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .lock()
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut inner = self.lock();
        if inner.strings.contains_key(key) || inner.sets.contains_key(key) {
            inner.ttls.insert(key.to_string(), ttl_seconds);
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheError> {
        Ok(self.lock().ttls.get(key).copied())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
