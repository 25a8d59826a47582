//! Token refresh request and errors.

use thiserror::Error;

use crate::domain::auth::models::token::TokenError;
use crate::domain::session::ports::CacheError;

/// Validation errors constructing a refresh request.
#[derive(Debug, Error)]
pub enum InvalidRefresh {
    #[error("refresh token must be present")]
    MissingToken,

    #[error("device id must be present")]
    MissingDeviceId,
}

/// Errors executing a refresh.
///
/// Every way a refresh can be refused by policy (bad signature, wrong type,
/// expired, device mismatch, no matching session, dead user) collapses into
/// `InvalidToken`: callers learn nothing beyond "log in again".
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("invalid refresh token")]
    InvalidToken,

    #[error(transparent)]
    Database(anyhow::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Signing the replacement tokens failed.
    #[error(transparent)]
    Token(TokenError),
}

/// Request to rotate a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshAccessToken {
    pub refresh_token: String,
    /// The caller's device id; must match the token's embedded device id
    /// when one is present.
    pub device_id: String,
}

impl RefreshAccessToken {
    pub fn new(refresh_token: &str, device_id: &str) -> Result<Self, InvalidRefresh> {
        if refresh_token.trim().is_empty() {
            return Err(InvalidRefresh::MissingToken);
        }
        if device_id.trim().is_empty() {
            return Err(InvalidRefresh::MissingDeviceId);
        }
        Ok(Self {
            refresh_token: refresh_token.to_string(),
            device_id: device_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_request_requires_both_fields() {
        assert!(RefreshAccessToken::new("token", "device").is_ok());
        assert!(matches!(
            RefreshAccessToken::new("", "device"),
            Err(InvalidRefresh::MissingToken)
        ));
        assert!(matches!(
            RefreshAccessToken::new("token", "  "),
            Err(InvalidRefresh::MissingDeviceId)
        ));
    }
}
