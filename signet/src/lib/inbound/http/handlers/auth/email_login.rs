use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::{
    domain::{
        auth::{
            models::{
                login::{EmailLogin, LoginContext},
                outcome::LoginOutcome,
            },
            ports::AuthService,
        },
        health::ports::HealthService,
        session::models::DeviceDescriptor,
    },
    inbound::http::{ApiError, ApiSuccess, AppState},
};

#[derive(Debug, Deserialize, Serialize)]
pub struct HttpEmailLogin {
    email: String,
    password: String,
    client_id: Option<String>,
    device_id: Option<String>,
    device_info: Option<DeviceDescriptor>,
    fcm_token: Option<String>,
}

pub async fn login_with_email<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<HttpEmailLogin>,
) -> Result<ApiSuccess<LoginOutcome>, ApiError>
where
    AS: AuthService,
    HS: HealthService,
{
    let sso_only = body.client_id.is_none();
    let context = LoginContext::new(
        body.client_id.as_deref(),
        body.device_id,
        body.device_info,
        Some(addr.ip().to_string()),
        body.fcm_token,
    )?;
    let request = EmailLogin::new(&body.email, &body.password, context)?;

    let outcome = state
        .auth_service
        .login_with_email(&request)
        .await
        .map_err(ApiError::from)?;

    let message = if sso_only {
        "sso login successful, pick an application"
    } else {
        "login successful"
    };
    Ok(ApiSuccess::new(StatusCode::OK, message, outcome))
}
