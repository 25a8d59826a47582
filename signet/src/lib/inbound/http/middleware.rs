use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::{
    domain::{
        auth::models::{outcome::UserData, token::TokenError},
        auth::ports::AuthService,
        health::ports::HealthService,
    },
    inbound::http::{ApiError, AppState, Log500},
};

/// The bearer-authenticated caller, reconstructed entirely from access-token
/// claims. No storage lookup happens here: an already-issued access token
/// keeps working until its own expiry even after logout.
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub data: UserData,
}

#[async_trait]
impl<AS, HS> FromRequestParts<AppState<AS, HS>> for AuthenticatedUser
where
    AS: AuthService,
    HS: HealthService,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<AS, HS>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let data = state
            .auth_service
            .verify_access_token(bearer.token())
            .map_err(|e| match e {
                TokenError::Signing(_) => e.log_500(),
                _ => ApiError::Unauthorized("invalid token".to_string()),
            })?;

        Ok(AuthenticatedUser { id: data.id, data })
    }
}
