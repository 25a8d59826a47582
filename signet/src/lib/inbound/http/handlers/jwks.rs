use axum::{extract::State, Json};

use crate::{
    domain::{auth::models::token::JwkSet, auth::ports::AuthService, health::ports::HealthService},
    inbound::http::AppState,
};

/// GET /.well-known/jwks.json
///
/// Public, unenveloped: downstream services fetch this to verify access
/// tokens offline. The set is computed once at startup and never changes
/// for the life of the process.
pub async fn jwks<AS, HS>(State(state): State<AppState<AS, HS>>) -> Json<JwkSet>
where
    AS: AuthService,
    HS: HealthService,
{
    Json(state.auth_service.token_keys().jwk_set().clone())
}
