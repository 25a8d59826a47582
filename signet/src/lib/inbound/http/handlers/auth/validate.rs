use axum::http::StatusCode;

use crate::{
    domain::auth::models::outcome::UserData,
    inbound::http::{middleware::AuthenticatedUser, ApiError, ApiSuccess},
};

/// POST /auth/validate: claims-only verification for backend services.
/// The bearer extractor has already done the work; this just echoes the
/// reconstructed user.
pub async fn validate_token(user: AuthenticatedUser) -> Result<ApiSuccess<UserData>, ApiError> {
    Ok(ApiSuccess::new(StatusCode::OK, "token valid", user.data))
}
