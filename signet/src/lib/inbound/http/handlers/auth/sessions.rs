use axum::{extract::State, http::StatusCode};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;

use crate::{
    domain::{
        auth::ports::AuthService,
        health::ports::HealthService,
        session::models::{DeviceDescriptor, SessionRecord},
    },
    inbound::http::{middleware::AuthenticatedUser, ApiError, ApiSuccess, AppState, Log500},
};

#[derive(Debug, Serialize, PartialEq)]
pub struct SessionInfo {
    device_id: String,
    device_info: Option<DeviceDescriptor>,
    ip_address: Option<String>,
    created_at: NaiveDateTime,
    last_activity: NaiveDateTime,
}

impl From<SessionRecord> for SessionInfo {
    fn from(value: SessionRecord) -> Self {
        Self {
            device_id: value.device_id,
            device_info: value.device_info,
            ip_address: value.ip_address,
            created_at: value.created_at,
            last_activity: value.last_activity,
        }
    }
}

/// Live sessions grouped by client code.
#[derive(Debug, Serialize, PartialEq)]
pub struct SessionListData {
    sessions: HashMap<String, Vec<SessionInfo>>,
    total_clients: usize,
    total_sessions: usize,
}

/// GET /auth/sessions
pub async fn list_sessions<AS, HS>(
    user: AuthenticatedUser,
    State(state): State<AppState<AS, HS>>,
) -> Result<ApiSuccess<SessionListData>, ApiError>
where
    AS: AuthService,
    HS: HealthService,
{
    let records = state
        .auth_service
        .list_sessions(user.id)
        .await
        .map_err(|e| e.log_500())?;

    let total_sessions = records.len();
    let mut sessions: HashMap<String, Vec<SessionInfo>> = HashMap::new();
    for record in records {
        sessions
            .entry(record.client_id.clone())
            .or_default()
            .push(record.into());
    }
    let total_clients = sessions.len();

    let message =
        format!("found {total_sessions} active sessions across {total_clients} applications");
    Ok(ApiSuccess::new(
        StatusCode::OK,
        &message,
        SessionListData {
            sessions,
            total_clients,
            total_sessions,
        },
    ))
}
