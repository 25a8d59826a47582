pub mod login;
pub mod logout;
pub mod outcome;
pub mod refresh;
pub mod token;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

/// The means by which a user authenticates. One binding per
/// (kind, provider-scoped subject id); a user may hold several bindings of
/// different kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    Email,
    Google,
    Firebase,
    Apple,
    Github,
    Phone,
}

/// A stored auth-provider binding. `password_hash` is present only for
/// `ProviderKind::Email` and is a bcrypt-class hash.
#[derive(Debug, Clone)]
pub struct AuthBinding {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: ProviderKind,
    pub provider_user_id: String,
    pub password_hash: Option<String>,
    pub last_used_at: Option<NaiveDateTime>,
}

#[derive(Debug, Error)]
pub enum BindingError {
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// What an external provider vouched for, after its token or code was
/// verified out-of-process.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalIdentity {
    /// Provider-scoped subject id (Firebase uid, Google account id, ...).
    pub subject_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// A credential the per-provider preamble has already verified. Input to
/// the shared resolution tail.
#[derive(Debug, Clone)]
pub enum VerifiedIdentity {
    /// Password checked against the email binding's hash.
    Password { user_id: Uuid },
    /// Identity vouched for by an external provider.
    External {
        provider: ProviderKind,
        identity: ExternalIdentity,
    },
}
