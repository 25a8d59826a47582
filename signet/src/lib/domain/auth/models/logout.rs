//! Logout request and its four granularities.
//!
//! All variants are idempotent: logging out of sessions that no longer
//! exist succeeds quietly.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::application::models::ClientCode;
use crate::domain::session::ports::CacheError;

#[derive(Debug, Error)]
pub enum LogoutError {
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// What to invalidate.
#[derive(Debug, Clone)]
pub enum LogoutScope {
    /// Every app session plus the SSO session.
    All,
    /// The SSO session and the portal's own sessions; app sessions stay.
    SsoOnly,
    /// Every device session for one client.
    Client(ClientCode),
    /// One device's session for one client.
    ClientDevice {
        client_id: ClientCode,
        device_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct Logout {
    pub user_id: Uuid,
    pub scope: LogoutScope,
}

impl Logout {
    pub fn new(user_id: Uuid, scope: LogoutScope) -> Self {
        Self { user_id, scope }
    }
}
