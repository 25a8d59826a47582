use axum::{
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::{
    domain::{
        auth::{
            models::{
                login::{GoogleAuthUrl, GoogleCallback, LoginContext},
                outcome::LoginOutcome,
            },
            ports::AuthService,
        },
        health::ports::HealthService,
        session::models::DeviceDescriptor,
    },
    inbound::http::{ApiError, ApiSuccess, AppState},
};

// ===================
//  authorization url
// ===================

#[derive(Debug, Deserialize)]
pub struct GoogleAuthUrlParams {
    redirect_uri: String,
    state: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AuthUrlData {
    auth_url: String,
}

pub async fn google_auth_url<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    Query(params): Query<GoogleAuthUrlParams>,
) -> Result<ApiSuccess<AuthUrlData>, ApiError>
where
    AS: AuthService,
    HS: HealthService,
{
    let auth_url = state.auth_service.google_authorization_url(&GoogleAuthUrl {
        redirect_uri: params.redirect_uri,
        state: params.state,
    });
    Ok(ApiSuccess::new(
        StatusCode::OK,
        "google oauth url created",
        AuthUrlData { auth_url },
    ))
}

// ==========
//  callback
// ==========

/// Query parameters from the browser redirect. `state` and `scope` are
/// echoed by the provider and accepted without use; `device_info` arrives
/// JSON-encoded in the query string and is parsed leniently.
#[derive(Debug, Deserialize)]
pub struct GoogleCallbackParams {
    pub code: String,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub device_id: Option<String>,
    pub state: Option<String>,
    pub scope: Option<String>,
    pub fcm_token: Option<String>,
    pub device_info: Option<String>,
}

pub async fn google_callback<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<GoogleCallbackParams>,
) -> Result<ApiSuccess<LoginOutcome>, ApiError>
where
    AS: AuthService,
    HS: HealthService,
{
    let device_info: Option<DeviceDescriptor> = params
        .device_info
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok());

    let context = LoginContext::new(
        params.client_id.as_deref(),
        params.device_id,
        device_info,
        Some(addr.ip().to_string()),
        params.fcm_token,
    )?;
    let request = GoogleCallback::new(&params.code, params.redirect_uri, context)?;

    state
        .auth_service
        .login_with_google(&request)
        .await
        .map_err(ApiError::from)
        .map(|outcome| ApiSuccess::new(StatusCode::OK, "login successful", outcome))
}
