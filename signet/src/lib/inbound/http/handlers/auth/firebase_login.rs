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
                login::{FirebaseLogin, LoginContext},
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
pub struct HttpFirebaseLogin {
    firebase_token: String,
    client_id: Option<String>,
    device_id: Option<String>,
    device_info: Option<DeviceDescriptor>,
    fcm_token: Option<String>,
}

pub async fn login_with_firebase<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<HttpFirebaseLogin>,
) -> Result<ApiSuccess<LoginOutcome>, ApiError>
where
    AS: AuthService,
    HS: HealthService,
{
    let context = LoginContext::new(
        body.client_id.as_deref(),
        body.device_id,
        body.device_info,
        Some(addr.ip().to_string()),
        body.fcm_token,
    )?;
    let request = FirebaseLogin::new(&body.firebase_token, context)?;

    state
        .auth_service
        .login_with_firebase(&request)
        .await
        .map_err(ApiError::from)
        .map(|outcome| ApiSuccess::new(StatusCode::OK, "login successful", outcome))
}
