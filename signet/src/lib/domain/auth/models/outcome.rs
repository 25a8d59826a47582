//! Uniform outcomes returned by the login-type flows.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::application::models::Application;
use crate::domain::auth::models::token::AccessClaims;
use crate::domain::user::models::{User, UserRole};

pub const TOKEN_TYPE_BEARER: &str = "bearer";

/// Minimal application info echoed back to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowedApp {
    pub id: String,
    pub code: String,
    pub name: String,
    pub base_url: Option<String>,
}

/// User identity as carried in outcomes and by token validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub id: Uuid,
    pub role: UserRole,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub allowed_apps: Vec<AllowedApp>,
}

impl UserData {
    /// Builds user data from a loaded user and their assigned applications.
    /// Inactive applications are not advertised.
    pub fn from_user(user: &User, assigned_apps: &[Application]) -> Self {
        let allowed_apps = assigned_apps
            .iter()
            .filter(|app| app.is_active)
            .map(|app| AllowedApp {
                id: app.id.to_string(),
                code: app.code.to_string(),
                name: app.name.clone(),
                base_url: app.base_url.clone(),
            })
            .collect();

        Self {
            id: user.id,
            role: user.role,
            name: Some(user.name.clone()),
            email: user.email_str(),
            avatar_url: user.avatar_url.clone(),
            allowed_apps,
        }
    }

    /// Reconstructs user data from access-token claims alone, for the
    /// validation path that deliberately never touches storage. Only the
    /// codes survive the claims round trip.
    pub fn from_access_claims(claims: &AccessClaims) -> Self {
        let allowed_apps = claims
            .allowed_apps
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|code| AllowedApp {
                id: String::new(),
                code,
                name: String::new(),
                base_url: None,
            })
            .collect();

        Self {
            id: claims.sub,
            role: claims.role,
            name: claims.name.clone(),
            email: claims.email.clone(),
            avatar_url: claims.avatar_url.clone(),
            allowed_apps,
        }
    }
}

/// Unified login / exchange outcome.
///
/// `sso_token` is always present. The app token fields are present when a
/// client id was supplied; SSO-only logins still carry portal-scoped access
/// and refresh tokens but never a device id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub sso_token: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub device_id: Option<String>,
    pub token_type: String,
    pub expires_in: Option<i64>,
    pub user: UserData,
}

/// Outcome of a token refresh. No SSO token: refresh never touches the
/// global session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}
