use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;
use uuid::Uuid;

/// Reserved client code meaning "the SSO portal frontend itself". It has no
/// application row; refresh tokens without a `client_id` claim fall back to
/// it, and `logout_sso` clears its sessions.
pub const SSO_PORTAL_CLIENT: &str = "sso_portal";

// ========
//  errors
// ========

/// Validation errors when parsing a client code.
#[derive(Debug, Error, Clone)]
pub enum InvalidClientCode {
    /// Codes must be at least 2 characters.
    #[error("must be at least 2 characters long")]
    TooShort,

    /// Codes must not exceed 100 characters.
    #[error("must not exceed 100 characters")]
    TooLong,

    /// Codes are lowercase alphanumeric plus `_` and `-`.
    #[error("may only contain lowercase letters, digits, '_' and '-'")]
    Charset,
}

/// Errors from the application repository.
#[derive(Debug, Error)]
pub enum ApplicationRepoError {
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Outcome of the access gate when a client code was supplied.
#[derive(Debug, Error)]
pub enum ClientAccessError {
    /// Unknown or inactive application code.
    #[error("application '{0}' not found or inactive")]
    AppNotFound(String),

    /// The user is not assigned to the application.
    #[error("user has no access to application '{0}'")]
    AppNotPermitted(String),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<ApplicationRepoError> for ClientAccessError {
    fn from(value: ApplicationRepoError) -> Self {
        match value {
            ApplicationRepoError::Database(e) => Self::Database(e),
        }
    }
}

// ==========
//  newtypes
// ==========

/// A validated application short code, used as the `client_id` in token
/// claims and as a routing key in session cache keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientCode(String);

impl ClientCode {
    pub fn new(raw: &str) -> Result<Self, InvalidClientCode> {
        let trimmed = raw.trim();

        if trimmed.len() < 2 {
            return Err(InvalidClientCode::TooShort);
        }

        if trimmed.len() > 100 {
            return Err(InvalidClientCode::TooLong);
        }

        if !trimmed
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(InvalidClientCode::Charset);
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ClientCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ClientCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ClientCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ClientCode::new(raw.as_str()).map_err(serde::de::Error::custom)
    }
}

// ======
//  main
// ======

/// A downstream application permitted to receive tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub name: String,
    pub code: ClientCode,
    pub base_url: Option<String>,
    pub is_active: bool,
    /// When set, at most one live session per (user, client) is allowed.
    pub single_session: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ====================
    //  `ClientCode` tests
    // ====================

    #[test]
    fn test_client_code_accepts_valid_codes() {
        for raw in ["hris", "payroll", "hris_web", "app-2", "ab"] {
            assert!(ClientCode::new(raw).is_ok(), "expected '{raw}' to be valid");
        }
    }

    #[test]
    fn test_client_code_rejects_too_short() {
        assert!(matches!(
            ClientCode::new("a"),
            Err(InvalidClientCode::TooShort)
        ));
    }

    #[test]
    fn test_client_code_rejects_uppercase_and_spaces() {
        assert!(matches!(
            ClientCode::new("HRIS"),
            Err(InvalidClientCode::Charset)
        ));
        assert!(matches!(
            ClientCode::new("my app"),
            Err(InvalidClientCode::Charset)
        ));
    }

    #[test]
    fn test_client_code_trims_before_validating() {
        let code = ClientCode::new("  kiosk  ").unwrap();
        assert_eq!(code.as_str(), "kiosk");
    }

    #[test]
    fn test_sso_portal_sentinel_is_a_valid_code_shape() {
        // The sentinel never has an application row but must survive the
        // same key/claim plumbing as real codes.
        assert!(ClientCode::new(SSO_PORTAL_CLIENT).is_ok());
    }
}
