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
            models::{login::ExchangeSsoToken, outcome::LoginOutcome},
            ports::AuthService,
        },
        health::ports::HealthService,
        session::models::DeviceDescriptor,
    },
    inbound::http::{ApiError, ApiSuccess, AppState},
};

#[derive(Debug, Deserialize, Serialize)]
pub struct HttpExchangeSsoToken {
    sso_token: String,
    client_id: String,
    device_id: Option<String>,
    device_info: Option<DeviceDescriptor>,
    fcm_token: Option<String>,
}

pub async fn exchange_sso_token<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<HttpExchangeSsoToken>,
) -> Result<ApiSuccess<LoginOutcome>, ApiError>
where
    AS: AuthService,
    HS: HealthService,
{
    let request = ExchangeSsoToken::new(
        &body.sso_token,
        &body.client_id,
        body.device_id,
        body.device_info,
        Some(addr.ip().to_string()),
        body.fcm_token,
    )?;

    let client_id = request.client_id.clone();
    state
        .auth_service
        .exchange_sso_token(&request)
        .await
        .map_err(ApiError::from)
        .map(|outcome| {
            ApiSuccess::new(
                StatusCode::OK,
                &format!("token exchange successful for application {client_id}"),
                outcome,
            )
        })
}
