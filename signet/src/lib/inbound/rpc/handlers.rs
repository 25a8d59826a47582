//! All RPC methods in one place, mirroring the wire shapes of the
//! original service-to-service surface: `ValidateToken`, `LoginWithEmail`,
//! `LoginWithFirebase`, `RefreshToken`, `ExchangeSSOToken`, `Logout`,
//! `GetSessions`.

use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    application::models::{ClientAccessError, ClientCode},
    auth::{
        models::{
            login::{EmailLogin, ExchangeSsoToken, FirebaseLogin, InvalidLogin, LoginContext, LoginError},
            logout::{Logout, LogoutScope},
            outcome::{LoginOutcome, UserData},
            refresh::{RefreshAccessToken, RefreshError},
        },
        ports::AuthService,
    },
    health::ports::HealthService,
    session::models::{DeviceDescriptor, SessionRecord},
};
use crate::inbound::http::AppState;

const INTERNAL_ERROR: &str = "internal error";

/// Splits a login failure into "tell the caller" vs "opaque 500".
fn login_failure(error: LoginError) -> Result<String, StatusCode> {
    match error {
        LoginError::Broker(_)
        | LoginError::FailedToVerify(_)
        | LoginError::Database(_)
        | LoginError::Cache(_)
        | LoginError::Token(_)
        | LoginError::ClientAccess(ClientAccessError::Database(_)) => {
            tracing::error!(error = ?error, "rpc login failed unexpectedly");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
        other => Ok(other.to_string()),
    }
}

// ================
//  validate token
// ================

#[derive(Debug, Deserialize, Serialize)]
pub struct RpcValidateTokenRequest {
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcValidateTokenResponse {
    pub is_valid: bool,
    pub user: Option<UserData>,
    pub error: Option<String>,
}

/// Bad tokens are an expected answer here, never a transport error.
pub async fn validate_token<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    Json(body): Json<RpcValidateTokenRequest>,
) -> Json<RpcValidateTokenResponse>
where
    AS: AuthService,
    HS: HealthService,
{
    match state.auth_service.verify_access_token(&body.access_token) {
        Ok(user) => Json(RpcValidateTokenResponse {
            is_valid: true,
            user: Some(user),
            error: None,
        }),
        Err(e) => Json(RpcValidateTokenResponse {
            is_valid: false,
            user: None,
            error: Some(e.to_string()),
        }),
    }
}

// ========
//  logins
// ========

#[derive(Debug, Deserialize, Serialize)]
pub struct RpcEmailLoginRequest {
    pub email: String,
    pub password: String,
    pub client_id: Option<String>,
    pub device_id: Option<String>,
    pub device_info: Option<DeviceDescriptor>,
    pub fcm_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RpcFirebaseLoginRequest {
    pub firebase_token: String,
    pub client_id: Option<String>,
    pub device_id: Option<String>,
    pub device_info: Option<DeviceDescriptor>,
    pub fcm_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcLoginResponse {
    pub success: bool,
    pub error: Option<String>,
    pub sso_token: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub device_id: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub user: Option<UserData>,
}

impl RpcLoginResponse {
    fn ok(outcome: LoginOutcome) -> Self {
        Self {
            success: true,
            error: None,
            sso_token: Some(outcome.sso_token),
            access_token: outcome.access_token,
            refresh_token: outcome.refresh_token,
            device_id: outcome.device_id,
            token_type: Some(outcome.token_type),
            expires_in: outcome.expires_in,
            user: Some(outcome.user),
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            sso_token: None,
            access_token: None,
            refresh_token: None,
            device_id: None,
            token_type: None,
            expires_in: None,
            user: None,
        }
    }
}

fn login_response(
    result: Result<LoginOutcome, LoginError>,
) -> (StatusCode, Json<RpcLoginResponse>) {
    match result {
        Ok(outcome) => (StatusCode::OK, Json(RpcLoginResponse::ok(outcome))),
        Err(e) => match login_failure(e) {
            Ok(message) => (StatusCode::OK, Json(RpcLoginResponse::failed(message))),
            Err(status) => (
                status,
                Json(RpcLoginResponse::failed(INTERNAL_ERROR.to_string())),
            ),
        },
    }
}

fn invalid_login_response(error: InvalidLogin) -> (StatusCode, Json<RpcLoginResponse>) {
    (StatusCode::OK, Json(RpcLoginResponse::failed(error.to_string())))
}

pub async fn login_with_email<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    Json(body): Json<RpcEmailLoginRequest>,
) -> (StatusCode, Json<RpcLoginResponse>)
where
    AS: AuthService,
    HS: HealthService,
{
    let context = match LoginContext::new(
        body.client_id.as_deref(),
        body.device_id,
        body.device_info,
        None,
        body.fcm_token,
    ) {
        Ok(context) => context,
        Err(e) => return invalid_login_response(e),
    };
    let request = match EmailLogin::new(&body.email, &body.password, context) {
        Ok(request) => request,
        Err(e) => return invalid_login_response(e),
    };

    login_response(state.auth_service.login_with_email(&request).await)
}

pub async fn login_with_firebase<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    Json(body): Json<RpcFirebaseLoginRequest>,
) -> (StatusCode, Json<RpcLoginResponse>)
where
    AS: AuthService,
    HS: HealthService,
{
    let context = match LoginContext::new(
        body.client_id.as_deref(),
        body.device_id,
        body.device_info,
        None,
        body.fcm_token,
    ) {
        Ok(context) => context,
        Err(e) => return invalid_login_response(e),
    };
    let request = match FirebaseLogin::new(&body.firebase_token, context) {
        Ok(request) => request,
        Err(e) => return invalid_login_response(e),
    };

    login_response(state.auth_service.login_with_firebase(&request).await)
}

// ==========
//  exchange
// ==========

#[derive(Debug, Deserialize, Serialize)]
pub struct RpcExchangeRequest {
    pub sso_token: String,
    pub client_id: String,
    pub device_id: Option<String>,
    pub device_info: Option<DeviceDescriptor>,
    pub fcm_token: Option<String>,
}

pub async fn exchange_sso_token<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    Json(body): Json<RpcExchangeRequest>,
) -> (StatusCode, Json<RpcLoginResponse>)
where
    AS: AuthService,
    HS: HealthService,
{
    let request = match ExchangeSsoToken::new(
        &body.sso_token,
        &body.client_id,
        body.device_id,
        body.device_info,
        None,
        body.fcm_token,
    ) {
        Ok(request) => request,
        Err(e) => return invalid_login_response(e),
    };

    login_response(state.auth_service.exchange_sso_token(&request).await)
}

// =========
//  refresh
// =========

#[derive(Debug, Deserialize, Serialize)]
pub struct RpcRefreshRequest {
    pub refresh_token: String,
    pub device_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcRefreshResponse {
    pub success: bool,
    pub error: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
}

impl RpcRefreshResponse {
    fn failed(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            access_token: None,
            refresh_token: None,
            token_type: None,
            expires_in: None,
        }
    }
}

pub async fn refresh_token<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    Json(body): Json<RpcRefreshRequest>,
) -> (StatusCode, Json<RpcRefreshResponse>)
where
    AS: AuthService,
    HS: HealthService,
{
    let request = match RefreshAccessToken::new(&body.refresh_token, &body.device_id) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::OK,
                Json(RpcRefreshResponse::failed(e.to_string())),
            )
        }
    };

    match state.auth_service.refresh_token(&request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(RpcRefreshResponse {
                success: true,
                error: None,
                access_token: Some(outcome.access_token),
                refresh_token: Some(outcome.refresh_token),
                token_type: Some(outcome.token_type),
                expires_in: Some(outcome.expires_in),
            }),
        ),
        Err(RefreshError::InvalidToken) => (
            StatusCode::OK,
            Json(RpcRefreshResponse::failed(
                "invalid refresh token or session expired".to_string(),
            )),
        ),
        Err(e) => {
            tracing::error!(error = ?e, "rpc refresh failed unexpectedly");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RpcRefreshResponse::failed(INTERNAL_ERROR.to_string())),
            )
        }
    }
}

// ========
//  logout
// ========

#[derive(Debug, Deserialize, Serialize)]
pub struct RpcLogoutRequest {
    pub user_id: String,
    /// Logout everywhere, overriding the client/device selectors.
    #[serde(default)]
    pub global: bool,
    pub client_id: Option<String>,
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcLogoutResponse {
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

pub async fn logout<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    Json(body): Json<RpcLogoutRequest>,
) -> (StatusCode, Json<RpcLogoutResponse>)
where
    AS: AuthService,
    HS: HealthService,
{
    let failed = |error: String| RpcLogoutResponse {
        success: false,
        message: None,
        error: Some(error),
    };

    let Ok(user_id) = Uuid::parse_str(&body.user_id) else {
        return (StatusCode::OK, Json(failed("invalid user id".to_string())));
    };

    let (scope, message) = if body.global {
        (LogoutScope::All, "logged out everywhere".to_string())
    } else {
        match (body.client_id.as_deref(), body.device_id.clone()) {
            (Some(client_id), Some(device_id)) => match ClientCode::new(client_id) {
                Ok(client_id) => {
                    let message = format!("logged out from {client_id} device {device_id}");
                    (
                        LogoutScope::ClientDevice {
                            client_id,
                            device_id,
                        },
                        message,
                    )
                }
                Err(e) => {
                    return (
                        StatusCode::OK,
                        Json(failed(format!("invalid client id: {e}"))),
                    )
                }
            },
            (Some(client_id), None) => match ClientCode::new(client_id) {
                Ok(client_id) => {
                    let message = format!("logged out from {client_id}");
                    (LogoutScope::Client(client_id), message)
                }
                Err(e) => {
                    return (
                        StatusCode::OK,
                        Json(failed(format!("invalid client id: {e}"))),
                    )
                }
            },
            (None, _) => (LogoutScope::All, "logged out everywhere".to_string()),
        }
    };

    match state
        .auth_service
        .logout(&Logout::new(user_id, scope))
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(RpcLogoutResponse {
                success: true,
                message: Some(message),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!(error = ?e, "rpc logout failed unexpectedly");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(failed(INTERNAL_ERROR.to_string())),
            )
        }
    }
}

// ==============
//  get sessions
// ==============

#[derive(Debug, Deserialize, Serialize)]
pub struct RpcGetSessionsRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcSessionInfo {
    pub device_id: String,
    pub client_id: String,
    pub device_info: Option<DeviceDescriptor>,
    pub ip_address: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_activity: NaiveDateTime,
}

impl From<SessionRecord> for RpcSessionInfo {
    fn from(value: SessionRecord) -> Self {
        Self {
            device_id: value.device_id,
            client_id: value.client_id,
            device_info: value.device_info,
            ip_address: value.ip_address,
            created_at: value.created_at,
            last_activity: value.last_activity,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcGetSessionsResponse {
    pub success: bool,
    pub sessions: Vec<RpcSessionInfo>,
    pub total_clients: usize,
    pub total_sessions: usize,
    pub error: Option<String>,
}

pub async fn get_sessions<AS, HS>(
    State(state): State<AppState<AS, HS>>,
    Json(body): Json<RpcGetSessionsRequest>,
) -> (StatusCode, Json<RpcGetSessionsResponse>)
where
    AS: AuthService,
    HS: HealthService,
{
    let failed = |status: StatusCode, error: String| {
        (
            status,
            Json(RpcGetSessionsResponse {
                success: false,
                sessions: vec![],
                total_clients: 0,
                total_sessions: 0,
                error: Some(error),
            }),
        )
    };

    let Ok(user_id) = Uuid::parse_str(&body.user_id) else {
        return failed(StatusCode::OK, "invalid user id".to_string());
    };

    match state.auth_service.list_sessions(user_id).await {
        Ok(records) => {
            let total_sessions = records.len();
            let total_clients = records
                .iter()
                .map(|r| r.client_id.as_str())
                .collect::<std::collections::HashSet<_>>()
                .len();
            let sessions = records.into_iter().map(RpcSessionInfo::from).collect();
            (
                StatusCode::OK,
                Json(RpcGetSessionsResponse {
                    success: true,
                    sessions,
                    total_clients,
                    total_sessions,
                    error: None,
                }),
            )
        }
        Err(e) => {
            tracing::error!(error = ?e, "rpc get_sessions failed unexpectedly");
            failed(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
        }
    }
}
