use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::{
    domain::{
        application::models::ClientCode,
        auth::{
            models::logout::{Logout, LogoutError, LogoutScope},
            ports::AuthService,
        },
        health::ports::HealthService,
    },
    inbound::http::{middleware::AuthenticatedUser, ApiError, ApiSuccess, AppState, Log500},
};

const CLIENT_ID_HEADER: &str = "x-client-id";
const DEVICE_ID_HEADER: &str = "x-device-id";

impl From<LogoutError> for ApiError {
    fn from(value: LogoutError) -> Self {
        match value {
            LogoutError::Cache(e) => e.log_500(),
        }
    }
}

/// POST /auth/logout: everything, everywhere.
pub async fn logout_all<AS, HS>(
    user: AuthenticatedUser,
    State(state): State<AppState<AS, HS>>,
) -> Result<ApiSuccess<()>, ApiError>
where
    AS: AuthService,
    HS: HealthService,
{
    state
        .auth_service
        .logout(&Logout::new(user.id, LogoutScope::All))
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::OK, "logged out from all applications", ()))
}

/// POST /auth/logout/sso: the global session only; app sessions survive.
pub async fn logout_sso<AS, HS>(
    user: AuthenticatedUser,
    State(state): State<AppState<AS, HS>>,
) -> Result<ApiSuccess<()>, ApiError>
where
    AS: AuthService,
    HS: HealthService,
{
    state
        .auth_service
        .logout(&Logout::new(user.id, LogoutScope::SsoOnly))
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::OK, "sso logout successful", ()))
}

/// POST /auth/logout/client: one client, selected by the `X-Client-ID`
/// header; narrowed to one device when `X-Device-ID` is present.
pub async fn logout_client<AS, HS>(
    user: AuthenticatedUser,
    State(state): State<AppState<AS, HS>>,
    headers: HeaderMap,
) -> Result<ApiSuccess<()>, ApiError>
where
    AS: AuthService,
    HS: HealthService,
{
    let client_id = headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::UnprocessableEntity("missing X-Client-ID header".to_string())
        })?;
    let client_id = ClientCode::new(client_id)
        .map_err(|e| ApiError::UnprocessableEntity(format!("invalid client id: {e}")))?;

    let device_id = headers
        .get(DEVICE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (scope, message) = match device_id {
        Some(device_id) => {
            let message = format!("logout from {client_id} (device {device_id}) successful");
            (
                LogoutScope::ClientDevice {
                    client_id,
                    device_id,
                },
                message,
            )
        }
        None => {
            let message = format!("logout from all devices of {client_id} successful");
            (LogoutScope::Client(client_id), message)
        }
    };

    state
        .auth_service
        .logout(&Logout::new(user.id, scope))
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::OK, &message, ()))
}
