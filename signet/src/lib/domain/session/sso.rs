//! Global SSO session store: one record per user, plus a reverse index
//! from token hash back to user id.
//!
//! | key | value |
//! |---|---|
//! | `sso:{user}` | serialized [`SsoRecord`] |
//! | `sso_token:{hash}` | user id |
//!
//! Creating a session rotates: any previous record and its reverse pointer
//! are deleted first, so exactly one SSO session exists per user at a time.
//! Deletion removes the reverse pointer before the primary, so a concurrent
//! validation can never resolve a token hash to a user whose record still
//! looks live.

use chrono::Utc;
use rand::RngCore;
use uuid::Uuid;

use crate::domain::session::{
    models::{Sha256Hash, SsoRecord},
    ports::{CacheError, KeyValueStore},
};

const SSO_PREFIX: &str = "sso";
const SSO_TOKEN_PREFIX: &str = "sso_token";

/// SSO sessions are long-lived: 30 days.
const SSO_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

/// SSO session store over a key-value cache.
#[derive(Debug, Clone)]
pub struct SsoSessionStore<C> {
    cache: C,
}

impl<C: KeyValueStore> SsoSessionStore<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    fn sso_key(user_id: Uuid) -> String {
        format!("{SSO_PREFIX}:{user_id}")
    }

    fn token_key(token_hash: &str) -> String {
        format!("{SSO_TOKEN_PREFIX}:{token_hash}")
    }

    /// 32 bytes from the system RNG, hex-encoded. The plain token exists
    /// only in the return value of [`create`](Self::create).
    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Creates (or rotates) the user's SSO session and returns the plain
    /// token. The only time the token is ever visible.
    pub async fn create(
        &self,
        user_id: Uuid,
        ip_address: Option<&str>,
    ) -> Result<String, CacheError> {
        if self.get_by_user(user_id).await?.is_some() {
            self.delete_internal(user_id).await?;
        }

        let token = Self::generate_token();
        let token_hash = token.sha256_hash();

        let now = Utc::now().naive_utc();
        let record = SsoRecord {
            user_id,
            token_hash: token_hash.clone(),
            ip_address: ip_address.map(str::to_string),
            created_at: now,
            last_activity: now,
        };
        let blob = serde_json::to_string(&record).map_err(CacheError::new)?;

        self.cache
            .set_ex(&Self::sso_key(user_id), &blob, SSO_TTL_SECONDS)
            .await?;
        self.cache
            .set_ex(
                &Self::token_key(&token_hash),
                &user_id.to_string(),
                SSO_TTL_SECONDS,
            )
            .await?;

        Ok(token)
    }

    /// Resolves a plain SSO token to its session record.
    ///
    /// On success `last_activity` is bumped in place, keeping the remaining
    /// TTL: validation does not extend an SSO session's life.
    pub async fn validate(&self, sso_token: &str) -> Result<Option<SsoRecord>, CacheError> {
        let token_hash = sso_token.sha256_hash();
        let Some(user_id) = self.cache.get(&Self::token_key(&token_hash)).await? else {
            return Ok(None);
        };
        let Ok(user_id) = Uuid::parse_str(&user_id) else {
            return Ok(None);
        };

        let Some(mut record) = self.get_by_user(user_id).await? else {
            return Ok(None);
        };
        if record.token_hash != token_hash {
            return Ok(None);
        }

        record.last_activity = Utc::now().naive_utc();
        let sso_key = Self::sso_key(user_id);
        if let Some(remaining) = self.cache.ttl(&sso_key).await? {
            if remaining > 0 {
                let blob = serde_json::to_string(&record).map_err(CacheError::new)?;
                self.cache.set_ex(&sso_key, &blob, remaining).await?;
            }
        }

        Ok(Some(record))
    }

    pub async fn get_by_user(&self, user_id: Uuid) -> Result<Option<SsoRecord>, CacheError> {
        let Some(blob) = self.cache.get(&Self::sso_key(user_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&blob) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(user = %user_id, error = %e, "dropping undecodable sso record");
                Ok(None)
            }
        }
    }

    /// Deletes the user's SSO session. Returns whether one existed.
    pub async fn delete(&self, user_id: Uuid) -> Result<bool, CacheError> {
        if self.get_by_user(user_id).await?.is_none() {
            return Ok(false);
        }
        self.delete_internal(user_id).await?;
        Ok(true)
    }

    /// Reverse pointer first, then the primary.
    async fn delete_internal(&self, user_id: Uuid) -> Result<(), CacheError> {
        if let Some(record) = self.get_by_user(user_id).await? {
            self.cache
                .delete(&Self::token_key(&record.token_hash))
                .await?;
        }
        self.cache.delete(&Self::sso_key(user_id)).await?;
        Ok(())
    }

    /// Validates, then rotates: the old token stops working and a fresh one
    /// is returned for the same user.
    pub async fn refresh(&self, sso_token: &str) -> Result<Option<String>, CacheError> {
        let Some(record) = self.validate(sso_token).await? else {
            return Ok(None);
        };
        let token = self
            .create(record.user_id, record.ip_address.as_deref())
            .await?;
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::memory::InMemoryStore;

    fn store() -> (SsoSessionStore<InMemoryStore>, InMemoryStore) {
        let cache = InMemoryStore::new();
        (SsoSessionStore::new(cache.clone()), cache)
    }

    #[tokio::test]
    async fn test_create_then_validate_round_trips() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        let token = store.create(user_id, Some("10.0.0.1")).await.unwrap();
        assert_eq!(token.len(), 64);

        let record = store.validate(&token).await.unwrap().unwrap();
        assert_eq!(record.user_id, user_id);
        assert_eq!(record.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(record.token_hash, token.sha256_hash());
    }

    #[tokio::test]
    async fn test_validate_unknown_token_returns_none() {
        let (store, _) = store();
        assert!(store.validate("no-such-token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_create_rotates_and_invalidates_first_token() {
        let (store, cache) = store();
        let user_id = Uuid::new_v4();

        let first = store.create(user_id, None).await.unwrap();
        let second = store.create(user_id, None).await.unwrap();
        assert_ne!(first, second);

        assert!(store.validate(&first).await.unwrap().is_none());
        assert!(store.validate(&second).await.unwrap().is_some());

        // Exactly one primary and one reverse pointer remain.
        assert_eq!(cache.keys_with_prefix("sso:").len(), 1);
        assert_eq!(cache.keys_with_prefix("sso_token:").len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_both_keys_and_is_idempotent() {
        let (store, cache) = store();
        let user_id = Uuid::new_v4();

        let token = store.create(user_id, None).await.unwrap();
        assert!(store.delete(user_id).await.unwrap());

        assert!(store.validate(&token).await.unwrap().is_none());
        assert!(cache.keys_with_prefix("sso").is_empty());

        assert!(!store.delete(user_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_rotates_token_for_same_user() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        let token = store.create(user_id, Some("10.0.0.2")).await.unwrap();
        let rotated = store.refresh(&token).await.unwrap().unwrap();

        assert!(store.validate(&token).await.unwrap().is_none());
        let record = store.validate(&rotated).await.unwrap().unwrap();
        assert_eq!(record.user_id, user_id);
        assert_eq!(record.ip_address.as_deref(), Some("10.0.0.2"));
    }

    #[tokio::test]
    async fn test_refresh_with_invalid_token_returns_none() {
        let (store, _) = store();
        assert!(store.refresh("bogus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_validate_preserves_remaining_ttl() {
        let (store, cache) = store();
        let user_id = Uuid::new_v4();

        let token = store.create(user_id, None).await.unwrap();
        let sso_key = format!("sso:{user_id}");

        // Pretend most of the TTL has elapsed.
        cache.force_ttl(&sso_key, 120);
        store.validate(&token).await.unwrap().unwrap();

        assert_eq!(cache.ttl(&sso_key).await.unwrap(), Some(120));
    }
}
