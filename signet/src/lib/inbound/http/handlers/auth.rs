pub mod email_login;
pub mod exchange;
pub mod firebase_login;
pub mod google_login;
pub mod logout;
pub mod refresh;
pub mod sessions;
pub mod validate;

use crate::domain::application::models::ClientAccessError;
use crate::domain::auth::models::login::{InvalidLogin, LoginError};
use crate::inbound::http::{ApiError, Log500};

impl From<LoginError> for ApiError {
    fn from(value: LoginError) -> Self {
        match value {
            LoginError::InvalidCredentials => {
                Self::Unauthorized("invalid credentials".to_string())
            }
            LoginError::UserNotRegistered => {
                Self::Unauthorized("user not registered".to_string())
            }
            LoginError::InvalidSsoSession => {
                Self::Unauthorized("invalid or expired sso session".to_string())
            }
            LoginError::ClientAccess(ClientAccessError::AppNotFound(code)) => {
                Self::NotFound(format!("application '{code}' not found or inactive"))
            }
            LoginError::ClientAccess(ClientAccessError::AppNotPermitted(code)) => {
                Self::Forbidden(format!("no access to application '{code}'"))
            }
            LoginError::ClientAccess(ClientAccessError::Database(e)) => e.log_500(),
            LoginError::AlreadyLoggedInElsewhere => {
                Self::BadRequest("already logged in on another device, log out first".to_string())
            }
            LoginError::Broker(e) => e.log_500(),
            LoginError::FailedToVerify(e) => e.log_500(),
            LoginError::Database(e) => e.log_500(),
            LoginError::Cache(e) => e.log_500(),
            LoginError::Token(e) => e.log_500(),
        }
    }
}

impl From<InvalidLogin> for ApiError {
    fn from(value: InvalidLogin) -> Self {
        Self::UnprocessableEntity(value.to_string())
    }
}
