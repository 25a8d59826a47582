//! Login-type request models: email/password, external ID token, OAuth
//! authorization code, and SSO-token exchange.
//!
//! Construction validates shape only (the cheap checks a handler can do
//! before touching any backend); credential verification happens in the
//! service layer.

use email_address::EmailAddress;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::application::models::{ClientAccessError, ClientCode, InvalidClientCode};
use crate::domain::auth::models::token::TokenError;
use crate::domain::auth::models::BindingError;
use crate::domain::session::models::{CreateSessionError, DeviceDescriptor};
use crate::domain::session::ports::CacheError;

/// Passwords shorter than this are rejected before any backend work.
const PASSWORD_MIN_LENGTH: usize = 6;

// ========
//  errors
// ========

/// Validation errors constructing a login-type request.
#[derive(Debug, Error)]
pub enum InvalidLogin {
    #[error("invalid email address")]
    Email(#[from] email_address::Error),

    #[error("password must be at least {PASSWORD_MIN_LENGTH} characters")]
    PasswordTooShort,

    #[error("token must be present")]
    MissingToken,

    #[error("authorization code must be present")]
    MissingCode,

    #[error("invalid client id: {0}")]
    ClientCode(#[from] InvalidClientCode),
}

/// Errors executing a login-type flow.
#[derive(Debug, Error)]
pub enum LoginError {
    /// Wrong email, wrong password, missing binding, rejected external
    /// token: all collapse into one answer.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The external provider vouched for an identity with no local user.
    #[error("user not registered")]
    UserNotRegistered,

    /// The presented SSO token resolves to no live SSO session.
    #[error("invalid or expired sso session")]
    InvalidSsoSession,

    #[error(transparent)]
    ClientAccess(#[from] ClientAccessError),

    /// Single-session policy blocked the login on a new device.
    #[error("already logged in on another device")]
    AlreadyLoggedInElsewhere,

    /// The external provider could not be reached or answered garbage.
    #[error(transparent)]
    Broker(anyhow::Error),

    /// The password hash comparison itself blew up (not a mismatch).
    #[error("failed to verify password")]
    FailedToVerify(#[source] anyhow::Error),

    #[error(transparent)]
    Database(anyhow::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl From<CreateSessionError> for LoginError {
    fn from(value: CreateSessionError) -> Self {
        match value {
            CreateSessionError::AlreadyLoggedInElsewhere => Self::AlreadyLoggedInElsewhere,
            CreateSessionError::Cache(e) => Self::Cache(e),
        }
    }
}

impl From<BindingError> for LoginError {
    fn from(value: BindingError) -> Self {
        match value {
            BindingError::Database(e) => Self::Database(e),
        }
    }
}

// ==========
//  requests
// ==========

/// The inputs every login-type flow shares once the credential itself is
/// out of the way.
#[derive(Debug, Clone, Default)]
pub struct LoginContext {
    /// Absent means SSO-only login: no app session is created.
    pub client_id: Option<ClientCode>,
    /// Caller-persisted device id; the session store assigns one if absent.
    pub device_id: Option<String>,
    pub device_info: Option<DeviceDescriptor>,
    pub ip_address: Option<String>,
    pub fcm_token: Option<String>,
}

impl LoginContext {
    pub fn new(
        client_id: Option<&str>,
        device_id: Option<String>,
        device_info: Option<DeviceDescriptor>,
        ip_address: Option<String>,
        fcm_token: Option<String>,
    ) -> Result<Self, InvalidLogin> {
        let client_id = client_id.map(ClientCode::new).transpose()?;
        Ok(Self {
            client_id,
            device_id,
            device_info,
            ip_address,
            fcm_token,
        })
    }
}

/// Email + password login.
#[derive(Debug, Clone)]
pub struct EmailLogin {
    pub email: EmailAddress,
    pub password: String,
    pub context: LoginContext,
}

impl EmailLogin {
    pub fn new(email: &str, password: &str, context: LoginContext) -> Result<Self, InvalidLogin> {
        let email = EmailAddress::from_str(email)?;
        if password.len() < PASSWORD_MIN_LENGTH {
            return Err(InvalidLogin::PasswordTooShort);
        }
        Ok(Self {
            email,
            password: password.to_string(),
            context,
        })
    }
}

/// Login with an ID token minted by the external identity broker.
#[derive(Debug, Clone)]
pub struct FirebaseLogin {
    pub firebase_token: String,
    pub context: LoginContext,
}

impl FirebaseLogin {
    pub fn new(firebase_token: &str, context: LoginContext) -> Result<Self, InvalidLogin> {
        if firebase_token.trim().is_empty() {
            return Err(InvalidLogin::MissingToken);
        }
        Ok(Self {
            firebase_token: firebase_token.to_string(),
            context,
        })
    }
}

/// Request for a Google OAuth authorization URL.
#[derive(Debug, Clone)]
pub struct GoogleAuthUrl {
    pub redirect_uri: String,
    pub state: Option<String>,
}

/// Google OAuth callback carrying the authorization code.
#[derive(Debug, Clone)]
pub struct GoogleCallback {
    pub code: String,
    /// Must match the redirect URI used on the authorization request.
    pub redirect_uri: Option<String>,
    pub context: LoginContext,
}

impl GoogleCallback {
    pub fn new(
        code: &str,
        redirect_uri: Option<String>,
        context: LoginContext,
    ) -> Result<Self, InvalidLogin> {
        if code.trim().is_empty() {
            return Err(InvalidLogin::MissingCode);
        }
        Ok(Self {
            code: code.to_string(),
            redirect_uri,
            context,
        })
    }
}

/// Exchange a live SSO token for app-scoped tokens. Unlike login, the
/// client id is mandatory here.
#[derive(Debug, Clone)]
pub struct ExchangeSsoToken {
    pub sso_token: String,
    pub client_id: ClientCode,
    pub device_id: Option<String>,
    pub device_info: Option<DeviceDescriptor>,
    pub ip_address: Option<String>,
    pub fcm_token: Option<String>,
}

impl ExchangeSsoToken {
    pub fn new(
        sso_token: &str,
        client_id: &str,
        device_id: Option<String>,
        device_info: Option<DeviceDescriptor>,
        ip_address: Option<String>,
        fcm_token: Option<String>,
    ) -> Result<Self, InvalidLogin> {
        if sso_token.trim().is_empty() {
            return Err(InvalidLogin::MissingToken);
        }
        let client_id = ClientCode::new(client_id)?;
        Ok(Self {
            sso_token: sso_token.to_string(),
            client_id,
            device_id,
            device_info,
            ip_address,
            fcm_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_login_rejects_bad_email() {
        let result = EmailLogin::new("not-an-email", "password123", LoginContext::default());
        assert!(matches!(result, Err(InvalidLogin::Email(_))));
    }

    #[test]
    fn test_email_login_rejects_short_password() {
        let result = EmailLogin::new("a@x.io", "pw", LoginContext::default());
        assert!(matches!(result, Err(InvalidLogin::PasswordTooShort)));
    }

    #[test]
    fn test_login_context_validates_client_code() {
        let result = LoginContext::new(Some("NOT VALID"), None, None, None, None);
        assert!(matches!(result, Err(InvalidLogin::ClientCode(_))));
    }

    #[test]
    fn test_firebase_login_rejects_blank_token() {
        let result = FirebaseLogin::new("   ", LoginContext::default());
        assert!(matches!(result, Err(InvalidLogin::MissingToken)));
    }

    #[test]
    fn test_exchange_requires_client_id() {
        assert!(ExchangeSsoToken::new("token", "hris", None, None, None, None).is_ok());
        assert!(ExchangeSsoToken::new("", "hris", None, None, None, None).is_err());
        assert!(ExchangeSsoToken::new("token", "", None, None, None, None).is_err());
    }
}
