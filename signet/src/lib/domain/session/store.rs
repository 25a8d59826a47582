//! Application session store: per-(user, client, device) records.
//!
//! Cache layout (all TTLs equal to the refresh-token lifetime; index TTLs
//! refreshed on every write):
//!
//! | key | value |
//! |---|---|
//! | `session:{user}:{client}:{device}` | serialized [`SessionRecord`] |
//! | `client_sessions:{user}:{client}` | set of device ids |
//! | `user_sessions:{user}` | set of `{client}:{device}` pairs |
//!
//! The indexes are the only way to enumerate or bulk-invalidate sessions.
//! Index cleanup on delete is best-effort: the primary record's absence is
//! the source of truth, and orphaned index entries are pruned the next time
//! an enumeration walks past them.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::session::{
    models::{CreateSession, CreateSessionError, SessionRecord, Sha256Hash, SESSION_RECORD_VERSION},
    ports::{CacheError, KeyValueStore},
};

const SESSION_PREFIX: &str = "session";
const CLIENT_SESSIONS_PREFIX: &str = "client_sessions";
const USER_SESSIONS_PREFIX: &str = "user_sessions";

/// Session store over a key-value cache.
#[derive(Debug, Clone)]
pub struct SessionStore<C> {
    cache: C,
    ttl_seconds: u64,
    max_active_sessions: usize,
}

impl<C: KeyValueStore> SessionStore<C> {
    /// `ttl_seconds` must equal the refresh-token lifetime so a session
    /// never outlives the token it validates.
    pub fn new(cache: C, ttl_seconds: u64, max_active_sessions: usize) -> Self {
        Self {
            cache,
            ttl_seconds,
            max_active_sessions,
        }
    }

    fn session_key(user_id: Uuid, client_id: &str, device_id: &str) -> String {
        format!("{SESSION_PREFIX}:{user_id}:{client_id}:{device_id}")
    }

    fn client_sessions_key(user_id: Uuid, client_id: &str) -> String {
        format!("{CLIENT_SESSIONS_PREFIX}:{user_id}:{client_id}")
    }

    fn user_sessions_key(user_id: Uuid) -> String {
        format!("{USER_SESSIONS_PREFIX}:{user_id}")
    }

    // ========
    //  create
    // ========

    /// Creates a session and returns the effective device id.
    ///
    /// Policy, driven by the owning application's `single_session` flag:
    /// - single-session and another device holds the session:
    ///   [`CreateSessionError::AlreadyLoggedInElsewhere`];
    /// - the same device already holds a session: it is replaced;
    /// - multi-session at the concurrency cap with a new device: the least
    ///   recently active session for this (user, client) is evicted first.
    pub async fn create(&self, request: &CreateSession) -> Result<String, CreateSessionError> {
        let user_id = request.user_id;
        let client_id = request.client_id.as_str();

        let existing = self.list_by_client(user_id, client_id).await?;

        let device_id = request
            .device_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let same_device = existing.iter().any(|s| s.device_id == device_id);

        if request.single_session {
            if !existing.is_empty() && !same_device {
                return Err(CreateSessionError::AlreadyLoggedInElsewhere);
            }
            if same_device {
                self.delete_device(user_id, client_id, &device_id).await?;
            }
        } else if same_device {
            self.delete_device(user_id, client_id, &device_id).await?;
        } else if existing.len() >= self.max_active_sessions {
            if let Some(oldest) = existing.iter().min_by_key(|s| s.last_activity) {
                tracing::info!(
                    user = %user_id,
                    client = client_id,
                    evicted_device = %oldest.device_id,
                    "session cap reached, evicting least recently active session"
                );
                self.delete_device(user_id, client_id, &oldest.device_id)
                    .await?;
            }
        }

        let now = Utc::now().naive_utc();
        let record = SessionRecord {
            version: SESSION_RECORD_VERSION,
            user_id,
            client_id: client_id.to_string(),
            device_id: device_id.clone(),
            refresh_token_hash: request.refresh_token.sha256_hash(),
            device_info: request.device_info.clone(),
            ip_address: request.ip_address.clone(),
            fcm_token: request.fcm_token.clone(),
            created_at: now,
            last_activity: now,
        };
        self.write(&record).await?;

        Ok(device_id)
    }

    async fn write(&self, record: &SessionRecord) -> Result<(), CacheError> {
        let blob = serde_json::to_string(record).map_err(CacheError::new)?;
        let session_key = Self::session_key(record.user_id, &record.client_id, &record.device_id);
        self.cache
            .set_ex(&session_key, &blob, self.ttl_seconds)
            .await?;

        let client_key = Self::client_sessions_key(record.user_id, &record.client_id);
        self.cache.set_add(&client_key, &record.device_id).await?;
        self.cache.expire(&client_key, self.ttl_seconds).await?;

        let user_key = Self::user_sessions_key(record.user_id);
        let pair = format!("{}:{}", record.client_id, record.device_id);
        self.cache.set_add(&user_key, &pair).await?;
        self.cache.expire(&user_key, self.ttl_seconds).await?;

        Ok(())
    }

    // =====
    //  get
    // =====

    pub async fn get(
        &self,
        user_id: Uuid,
        client_id: &str,
        device_id: &str,
    ) -> Result<Option<SessionRecord>, CacheError> {
        let key = Self::session_key(user_id, client_id, device_id);
        let Some(blob) = self.cache.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&blob) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(key, error = %e, "dropping undecodable session record");
                Ok(None)
            }
        }
    }

    /// True iff a session exists for the triple and its stored hash matches
    /// the presented refresh token.
    pub async fn validate_refresh_token(
        &self,
        user_id: Uuid,
        client_id: &str,
        device_id: &str,
        refresh_token: &str,
    ) -> Result<bool, CacheError> {
        let Some(record) = self.get(user_id, client_id, device_id).await? else {
            return Ok(false);
        };
        Ok(record.refresh_token_hash == refresh_token.sha256_hash())
    }

    // ========
    //  update
    // ========

    /// Rewrites the session with a fresh `last_activity`, optionally
    /// rotating the refresh-token hash or the push token. Re-SETEXes with
    /// the full TTL: a refresh implicitly extends the session.
    ///
    /// Returns `false` when no session exists for the triple.
    pub async fn update(
        &self,
        user_id: Uuid,
        client_id: &str,
        device_id: &str,
        refresh_token: Option<&str>,
        fcm_token: Option<&str>,
    ) -> Result<bool, CacheError> {
        let Some(mut record) = self.get(user_id, client_id, device_id).await? else {
            return Ok(false);
        };

        record.last_activity = Utc::now().naive_utc();
        if let Some(token) = refresh_token {
            record.refresh_token_hash = token.sha256_hash();
        }
        if let Some(token) = fcm_token {
            record.fcm_token = Some(token.to_string());
        }

        let blob = serde_json::to_string(&record).map_err(CacheError::new)?;
        let key = Self::session_key(user_id, client_id, device_id);
        self.cache.set_ex(&key, &blob, self.ttl_seconds).await?;
        Ok(true)
    }

    // ========
    //  delete
    // ========

    /// Deletes one device's session. Idempotent.
    pub async fn delete_device(
        &self,
        user_id: Uuid,
        client_id: &str,
        device_id: &str,
    ) -> Result<(), CacheError> {
        let session_key = Self::session_key(user_id, client_id, device_id);
        self.cache.delete(&session_key).await?;

        let client_key = Self::client_sessions_key(user_id, client_id);
        if let Err(e) = self.cache.set_remove(&client_key, device_id).await {
            tracing::warn!(key = client_key, error = %e, "best-effort index cleanup failed");
        }
        let user_key = Self::user_sessions_key(user_id);
        let pair = format!("{client_id}:{device_id}");
        if let Err(e) = self.cache.set_remove(&user_key, &pair).await {
            tracing::warn!(key = user_key, error = %e, "best-effort index cleanup failed");
        }
        Ok(())
    }

    /// Deletes every session for (user, client). Returns how many primaries
    /// were removed. Idempotent.
    pub async fn delete_client(&self, user_id: Uuid, client_id: &str) -> Result<u64, CacheError> {
        let client_key = Self::client_sessions_key(user_id, client_id);
        let device_ids = self.cache.set_members(&client_key).await?;

        let mut deleted = 0;
        for device_id in &device_ids {
            let session_key = Self::session_key(user_id, client_id, device_id);
            self.cache.delete(&session_key).await?;
            deleted += 1;

            let user_key = Self::user_sessions_key(user_id);
            let pair = format!("{client_id}:{device_id}");
            if let Err(e) = self.cache.set_remove(&user_key, &pair).await {
                tracing::warn!(key = user_key, error = %e, "best-effort index cleanup failed");
            }
        }

        self.cache.delete(&client_key).await?;
        Ok(deleted)
    }

    /// Deletes every session the user holds, across all clients and
    /// devices. Returns how many primaries were removed. Idempotent.
    pub async fn delete_all(&self, user_id: Uuid) -> Result<u64, CacheError> {
        let user_key = Self::user_sessions_key(user_id);
        let pairs = self.cache.set_members(&user_key).await?;

        let mut deleted = 0;
        for pair in &pairs {
            let Some((client_id, device_id)) = pair.split_once(':') else {
                continue;
            };
            let session_key = Self::session_key(user_id, client_id, device_id);
            self.cache.delete(&session_key).await?;
            deleted += 1;

            let client_key = Self::client_sessions_key(user_id, client_id);
            if let Err(e) = self.cache.set_remove(&client_key, device_id).await {
                tracing::warn!(key = client_key, error = %e, "best-effort index cleanup failed");
            }
        }

        self.cache.delete(&user_key).await?;
        Ok(deleted)
    }

    // ===========
    //  enumerate
    // ===========

    /// Lists live sessions for (user, client). Index entries whose primary
    /// has expired or been deleted are skipped and pruned on the way past.
    pub async fn list_by_client(
        &self,
        user_id: Uuid,
        client_id: &str,
    ) -> Result<Vec<SessionRecord>, CacheError> {
        let client_key = Self::client_sessions_key(user_id, client_id);
        let device_ids = self.cache.set_members(&client_key).await?;

        let mut sessions = Vec::with_capacity(device_ids.len());
        for device_id in &device_ids {
            match self.get(user_id, client_id, device_id).await? {
                Some(record) => sessions.push(record),
                None => self.prune_index_entry(user_id, client_id, device_id).await,
            }
        }
        Ok(sessions)
    }

    /// Lists every live session the user holds, self-healing as it goes.
    pub async fn list_all(&self, user_id: Uuid) -> Result<Vec<SessionRecord>, CacheError> {
        let user_key = Self::user_sessions_key(user_id);
        let pairs = self.cache.set_members(&user_key).await?;

        let mut sessions = Vec::with_capacity(pairs.len());
        for pair in &pairs {
            let Some((client_id, device_id)) = pair.split_once(':') else {
                continue;
            };
            match self.get(user_id, client_id, device_id).await? {
                Some(record) => sessions.push(record),
                None => self.prune_index_entry(user_id, client_id, device_id).await,
            }
        }
        Ok(sessions)
    }

    async fn prune_index_entry(&self, user_id: Uuid, client_id: &str, device_id: &str) {
        let client_key = Self::client_sessions_key(user_id, client_id);
        let user_key = Self::user_sessions_key(user_id);
        let pair = format!("{client_id}:{device_id}");
        if let Err(e) = self.cache.set_remove(&client_key, device_id).await {
            tracing::warn!(key = client_key, error = %e, "failed to prune orphan index entry");
        }
        if let Err(e) = self.cache.set_remove(&user_key, &pair).await {
            tracing::warn!(key = user_key, error = %e, "failed to prune orphan index entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::memory::InMemoryStore;
    use crate::domain::session::models::DeviceDescriptor;

    const TTL: u64 = 60 * 60;

    fn store() -> (SessionStore<InMemoryStore>, InMemoryStore) {
        let cache = InMemoryStore::new();
        (SessionStore::new(cache.clone(), TTL, 5), cache)
    }

    fn create_request(user_id: Uuid, device_id: Option<&str>) -> CreateSession {
        CreateSession {
            user_id,
            client_id: "hris".to_string(),
            refresh_token: "refresh-token".to_string(),
            single_session: false,
            device_id: device_id.map(str::to_string),
            device_info: Some(DeviceDescriptor {
                platform: Some("android".to_string()),
                ..Default::default()
            }),
            ip_address: Some("10.0.0.1".to_string()),
            fcm_token: None,
        }
    }

    // ==============
    //  create tests
    // ==============

    #[tokio::test]
    async fn test_create_assigns_device_id_when_absent() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        let device_id = store.create(&create_request(user_id, None)).await.unwrap();
        assert!(!device_id.is_empty());
        assert!(store
            .get(user_id, "hris", &device_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_create_stores_hash_not_token() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        let device_id = store.create(&create_request(user_id, None)).await.unwrap();
        let record = store.get(user_id, "hris", &device_id).await.unwrap().unwrap();

        assert_eq!(record.refresh_token_hash, "refresh-token".sha256_hash());
        assert_ne!(record.refresh_token_hash, "refresh-token");
    }

    #[tokio::test]
    async fn test_create_keeps_indexes_consistent() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        let d1 = store
            .create(&create_request(user_id, Some("d1")))
            .await
            .unwrap();
        let mut request = create_request(user_id, Some("d2"));
        request.client_id = "payroll".to_string();
        let d2 = store.create(&request).await.unwrap();

        let by_client = store.list_by_client(user_id, "hris").await.unwrap();
        assert_eq!(by_client.len(), 1);
        assert_eq!(by_client[0].device_id, d1);

        let all = store.list_all(user_id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|s| s.device_id == d2 && s.client_id == "payroll"));
    }

    // ========================
    //  single-session policy
    // ========================

    #[tokio::test]
    async fn test_single_session_rejects_second_device() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        let mut request = create_request(user_id, Some("d1"));
        request.single_session = true;
        store.create(&request).await.unwrap();

        let mut second = create_request(user_id, Some("d2"));
        second.single_session = true;
        assert!(matches!(
            store.create(&second).await,
            Err(CreateSessionError::AlreadyLoggedInElsewhere)
        ));

        // The first device's session is untouched by the rejected attempt.
        assert!(store.get(user_id, "hris", "d1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_single_session_same_device_replaces() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        let mut request = create_request(user_id, Some("d1"));
        request.single_session = true;
        store.create(&request).await.unwrap();

        let mut again = create_request(user_id, Some("d1"));
        again.single_session = true;
        again.refresh_token = "rotated".to_string();
        let device_id = store.create(&again).await.unwrap();
        assert_eq!(device_id, "d1");

        let sessions = store.list_by_client(user_id, "hris").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].refresh_token_hash, "rotated".sha256_hash());
    }

    // ===============
    //  concurrency cap
    // ===============

    #[tokio::test]
    async fn test_cap_evicts_least_recently_active_session() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        for i in 1..=5 {
            store
                .create(&create_request(user_id, Some(&format!("d{i}"))))
                .await
                .unwrap();
        }
        // d2 is now the least recently active: bump every other session.
        for i in [1, 3, 4, 5] {
            assert!(store
                .update(user_id, "hris", &format!("d{i}"), None, None)
                .await
                .unwrap());
        }

        store
            .create(&create_request(user_id, Some("d6")))
            .await
            .unwrap();

        let sessions = store.list_by_client(user_id, "hris").await.unwrap();
        assert_eq!(sessions.len(), 5);
        assert!(!sessions.iter().any(|s| s.device_id == "d2"));
        assert!(sessions.iter().any(|s| s.device_id == "d6"));
    }

    #[tokio::test]
    async fn test_known_device_at_cap_replaces_without_eviction() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        for i in 1..=5 {
            store
                .create(&create_request(user_id, Some(&format!("d{i}"))))
                .await
                .unwrap();
        }

        store
            .create(&create_request(user_id, Some("d3")))
            .await
            .unwrap();

        let sessions = store.list_by_client(user_id, "hris").await.unwrap();
        assert_eq!(sessions.len(), 5);
        for i in 1..=5 {
            assert!(sessions.iter().any(|s| s.device_id == format!("d{i}")));
        }
    }

    // ==========================
    //  refresh token validation
    // ==========================

    #[tokio::test]
    async fn test_validate_refresh_token_matches_only_live_hash() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        let device_id = store.create(&create_request(user_id, None)).await.unwrap();

        assert!(store
            .validate_refresh_token(user_id, "hris", &device_id, "refresh-token")
            .await
            .unwrap());
        assert!(!store
            .validate_refresh_token(user_id, "hris", &device_id, "some-other-token")
            .await
            .unwrap());
        assert!(!store
            .validate_refresh_token(user_id, "hris", "unknown-device", "refresh-token")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_update_rotates_hash_and_invalidates_old_token() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        let device_id = store.create(&create_request(user_id, None)).await.unwrap();
        assert!(store
            .update(user_id, "hris", &device_id, Some("next-token"), None)
            .await
            .unwrap());

        assert!(!store
            .validate_refresh_token(user_id, "hris", &device_id, "refresh-token")
            .await
            .unwrap());
        assert!(store
            .validate_refresh_token(user_id, "hris", &device_id, "next-token")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_session_returns_false() {
        let (store, _) = store();
        assert!(!store
            .update(Uuid::new_v4(), "hris", "d1", Some("token"), None)
            .await
            .unwrap());
    }

    // ==============
    //  delete tests
    // ==============

    #[tokio::test]
    async fn test_delete_variants_are_idempotent() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        store
            .create(&create_request(user_id, Some("d1")))
            .await
            .unwrap();

        store.delete_device(user_id, "hris", "d1").await.unwrap();
        store.delete_device(user_id, "hris", "d1").await.unwrap();
        assert_eq!(store.delete_client(user_id, "hris").await.unwrap(), 0);
        assert_eq!(store.delete_all(user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_client_removes_all_devices_for_that_client_only() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        store
            .create(&create_request(user_id, Some("d1")))
            .await
            .unwrap();
        store
            .create(&create_request(user_id, Some("d2")))
            .await
            .unwrap();
        let mut other = create_request(user_id, Some("d3"));
        other.client_id = "payroll".to_string();
        store.create(&other).await.unwrap();

        assert_eq!(store.delete_client(user_id, "hris").await.unwrap(), 2);
        assert!(store.list_by_client(user_id, "hris").await.unwrap().is_empty());
        assert_eq!(store.list_all(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_clears_every_client() {
        let (store, _) = store();
        let user_id = Uuid::new_v4();

        store
            .create(&create_request(user_id, Some("d1")))
            .await
            .unwrap();
        let mut other = create_request(user_id, Some("d2"));
        other.client_id = "payroll".to_string();
        store.create(&other).await.unwrap();

        assert_eq!(store.delete_all(user_id).await.unwrap(), 2);
        assert!(store.list_all(user_id).await.unwrap().is_empty());
        assert!(store.list_by_client(user_id, "payroll").await.unwrap().is_empty());
    }

    // ==============
    //  self-healing
    // ==============

    #[tokio::test]
    async fn test_enumeration_skips_and_prunes_orphan_index_entries() {
        let (store, cache) = store();
        let user_id = Uuid::new_v4();

        let device_id = store
            .create(&create_request(user_id, Some("d1")))
            .await
            .unwrap();

        // Simulate TTL expiry of the primary while the indexes linger.
        cache
            .delete(&format!("session:{user_id}:hris:{device_id}"))
            .await
            .unwrap();

        assert!(store.list_by_client(user_id, "hris").await.unwrap().is_empty());

        // The orphan was pruned from both indexes.
        assert!(cache
            .set_members(&format!("client_sessions:{user_id}:hris"))
            .await
            .unwrap()
            .is_empty());
        assert!(cache
            .set_members(&format!("user_sessions:{user_id}"))
            .await
            .unwrap()
            .is_empty());
    }
}
