use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::session::ports::CacheError;

/// Version stamped into every stored session blob so fields can be added
/// without invalidating live sessions.
pub const SESSION_RECORD_VERSION: u8 = 1;

// =========
//  hashing
// =========

/// SHA-256 hex digest, used wherever a token must be matched but never
/// stored in the clear.
pub trait Sha256Hash {
    fn sha256_hash(&self) -> String;
}

impl Sha256Hash for str {
    fn sha256_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.as_bytes());
        hex::encode(hasher.finalize())
    }
}

// ========
//  errors
// ========

/// Errors from session creation. Everything except the single-session
/// conflict is infrastructure trouble.
#[derive(Debug, Error)]
pub enum CreateSessionError {
    /// The application enforces one session per user and another device
    /// already holds it.
    #[error("already logged in on another device")]
    AlreadyLoggedInElsewhere,

    #[error(transparent)]
    Cache(#[from] CacheError),
}

// ========
//  models
// ========

/// Client-reported device metadata, stored verbatim with the session.
/// Unknown fields are kept in `extras` rather than dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub platform: Option<String>,
    pub os_version: Option<String>,
    pub app_version: Option<String>,
    pub device_name: Option<String>,
    #[serde(flatten)]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

/// The per-(user, client, device) session record as serialized into the
/// cache. The refresh token itself is never stored, only its hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default = "default_record_version")]
    pub version: u8,
    pub user_id: Uuid,
    pub client_id: String,
    pub device_id: String,
    pub refresh_token_hash: String,
    pub device_info: Option<DeviceDescriptor>,
    pub ip_address: Option<String>,
    pub fcm_token: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_activity: NaiveDateTime,
}

fn default_record_version() -> u8 {
    SESSION_RECORD_VERSION
}

/// The per-user global SSO record. Only one exists per user at a time;
/// creating a new one replaces the previous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsoRecord {
    pub user_id: Uuid,
    pub token_hash: String,
    pub ip_address: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_activity: NaiveDateTime,
}

/// Request to create an application session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: Uuid,
    pub client_id: String,
    /// The (provisional) refresh token; hashed before storage.
    pub refresh_token: String,
    /// The owning application's policy, not the caller's choice.
    pub single_session: bool,
    /// Absent on first login from a device; the store assigns one.
    pub device_id: Option<String>,
    pub device_info: Option<DeviceDescriptor>,
    pub ip_address: Option<String>,
    pub fcm_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hash_is_hex_of_expected_length() {
        let hash = "some-refresh-token".sha256_hash();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sha256_hash_differs_per_input() {
        assert_ne!("token-a".sha256_hash(), "token-b".sha256_hash());
    }

    #[test]
    fn test_session_record_blob_without_version_defaults_to_current() {
        // Records written before the version field must still parse.
        let blob = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "client_id": "hris",
            "device_id": "d1",
            "refresh_token_hash": "abc",
            "device_info": null,
            "ip_address": null,
            "fcm_token": null,
            "created_at": "2026-01-01T00:00:00",
            "last_activity": "2026-01-01T00:00:00",
        });
        let record: SessionRecord = serde_json::from_value(blob).unwrap();
        assert_eq!(record.version, SESSION_RECORD_VERSION);
    }

    #[test]
    fn test_device_descriptor_keeps_unknown_fields_in_extras() {
        let blob = serde_json::json!({
            "platform": "android",
            "os_version": "14",
            "screen": "1080x2400",
        });
        let descriptor: DeviceDescriptor = serde_json::from_value(blob).unwrap();
        assert_eq!(descriptor.platform.as_deref(), Some("android"));
        assert_eq!(
            descriptor.extras.get("screen"),
            Some(&serde_json::Value::String("1080x2400".to_string()))
        );
    }
}
