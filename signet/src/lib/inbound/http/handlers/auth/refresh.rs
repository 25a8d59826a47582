use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        auth::{
            models::{
                outcome::RefreshOutcome,
                refresh::{InvalidRefresh, RefreshAccessToken, RefreshError},
            },
            ports::AuthService,
        },
        health::ports::HealthService,
    },
    inbound::http::{ApiError, ApiSuccess, AppState, Log500},
};

impl From<RefreshError> for ApiError {
    fn from(value: RefreshError) -> Self {
        match value {
            RefreshError::InvalidToken => {
                Self::Unauthorized("invalid refresh token or session expired".to_string())
            }
            RefreshError::Database(e) => e.log_500(),
            RefreshError::Cache(e) => e.log_500(),
            RefreshError::Token(e) => e.log_500(),
        }
    }
}

impl From<InvalidRefresh> for ApiError {
    fn from(value: InvalidRefresh) -> Self {
        Self::UnprocessableEntity(value.to_string())
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HttpRefreshToken {
    refresh_token: String,
    device_id: String,
}

pub async fn refresh_token<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    Json(body): Json<HttpRefreshToken>,
) -> Result<ApiSuccess<RefreshOutcome>, ApiError>
where
    AS: AuthService,
    HS: HealthService,
{
    let request = RefreshAccessToken::new(&body.refresh_token, &body.device_id)?;

    state
        .auth_service
        .refresh_token(&request)
        .await
        .map_err(ApiError::from)
        .map(|outcome| ApiSuccess::new(StatusCode::OK, "token refreshed", outcome))
}
