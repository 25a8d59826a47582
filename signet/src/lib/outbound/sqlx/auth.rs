use chrono::{DateTime, Utc};
use sqlx_macros::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::auth::models::{AuthBinding, BindingError, ProviderKind};
use crate::domain::auth::ports::AuthProviderRepository;
use crate::outbound::sqlx::postgres::Postgres;

/// raw auth-provider binding record (unvalidated data from `PostgreSQL`)
#[derive(Debug, Clone, FromRow)]
pub struct DatabaseAuthBinding {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub provider_user_id: String,
    pub password_hash: Option<String>,
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum IntoAuthBindingError {
    #[error("invalid provider on binding row: {0}")]
    Provider(strum::ParseError),
}

impl TryFrom<DatabaseAuthBinding> for AuthBinding {
    type Error = IntoAuthBindingError;

    fn try_from(value: DatabaseAuthBinding) -> Result<Self, Self::Error> {
        let provider =
            ProviderKind::from_str(&value.provider).map_err(IntoAuthBindingError::Provider)?;
        Ok(Self {
            id: value.id,
            user_id: value.user_id,
            provider,
            provider_user_id: value.provider_user_id,
            password_hash: value.password_hash,
            last_used_at: value.last_used_at.map(|t| t.naive_utc()),
        })
    }
}

impl AuthProviderRepository for Postgres {
    async fn find_binding(
        &self,
        provider: ProviderKind,
        provider_user_id: &str,
    ) -> Result<Option<AuthBinding>, BindingError> {
        let row = sqlx::query_as::<_, DatabaseAuthBinding>(
            "SELECT id, user_id, provider, provider_user_id, password_hash, last_used_at \
             FROM auth_providers WHERE provider = $1 AND provider_user_id = $2",
        )
        .bind(provider.to_string())
        .bind(provider_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BindingError::Database(e.into()))?;

        row.map(AuthBinding::try_from)
            .transpose()
            .map_err(|e| BindingError::Database(e.into()))
    }

    async fn link_binding(
        &self,
        user_id: Uuid,
        provider: ProviderKind,
        provider_user_id: &str,
    ) -> Result<AuthBinding, BindingError> {
        let row = sqlx::query_as::<_, DatabaseAuthBinding>(
            "INSERT INTO auth_providers (id, user_id, provider, provider_user_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, NOW(), NOW()) \
             RETURNING id, user_id, provider, provider_user_id, password_hash, last_used_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(provider.to_string())
        .bind(provider_user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| BindingError::Database(e.into()))?;

        row.try_into().map_err(|e: IntoAuthBindingError| BindingError::Database(e.into()))
    }

    async fn touch_binding(&self, binding_id: Uuid) -> Result<(), BindingError> {
        sqlx::query("UPDATE auth_providers SET last_used_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(binding_id)
            .execute(&self.pool)
            .await
            .map_err(|e| BindingError::Database(e.into()))?;
        Ok(())
    }
}
