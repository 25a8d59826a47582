//! The access gate: may this user obtain tokens for this client?

use uuid::Uuid;

use crate::domain::application::{
    models::{Application, ClientAccessError},
    ports::ApplicationRepository,
};

/// Validates user access to a client application.
///
/// Shared by every login-type flow. With no client code the login is
/// SSO-only and the gate stands aside; otherwise the application must exist,
/// be active, and appear in the user's assignment set. The returned
/// [`Application`] carries the `single_session` policy the session store
/// needs.
pub async fn validate_client_access<R>(
    repo: &R,
    user_id: Uuid,
    client_id: Option<&str>,
) -> Result<Option<Application>, ClientAccessError>
where
    R: ApplicationRepository,
{
    let Some(client_id) = client_id else {
        return Ok(None);
    };

    let app = repo
        .find_application_by_code(client_id)
        .await?
        .filter(|app| app.is_active)
        .ok_or_else(|| ClientAccessError::AppNotFound(client_id.to_string()))?;

    let assigned = repo.list_applications_for_user(user_id).await?;
    if !assigned.iter().any(|a| a.id == app.id) {
        return Err(ClientAccessError::AppNotPermitted(client_id.to_string()));
    }

    Ok(Some(app))
}
