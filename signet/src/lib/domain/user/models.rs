use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

// =======
//  enums
// =======

/// Role carried into token claims and used for coarse authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    Superadmin,
    Admin,
    User,
    Guest,
}

/// Account status. Only `Active` users pass authentication paths; `Deleted`
/// is treated the same as a soft-delete timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
    Deleted,
}

// ========
//  errors
// ========

#[derive(Debug, Error)]
pub enum GetUserError {
    /// No matching live user. Deleted and soft-deleted users surface here
    /// too; callers must not be able to tell the difference.
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

// ======
//  main
// ======

/// A live user as seen by the authentication flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Option<EmailAddress>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
}

impl User {
    pub fn email_str(&self) -> Option<String> {
        self.email.as_ref().map(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_user_role_round_trips_through_strings() {
        for (role, s) in [
            (UserRole::Superadmin, "superadmin"),
            (UserRole::Admin, "admin"),
            (UserRole::User, "user"),
            (UserRole::Guest, "guest"),
        ] {
            assert_eq!(role.to_string(), s);
            assert_eq!(UserRole::from_str(s).unwrap(), role);
        }
    }

    #[test]
    fn test_user_status_rejects_unknown_values() {
        assert!(UserStatus::from_str("banned").is_err());
    }
}
