use sqlx_macros::FromRow;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::application::models::{
    Application, ApplicationRepoError, ClientCode, InvalidClientCode,
};
use crate::domain::application::ports::ApplicationRepository;
use crate::outbound::sqlx::postgres::Postgres;

/// raw application record (unvalidated data from `PostgreSQL`)
#[derive(Debug, Clone, FromRow)]
pub struct DatabaseApplication {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub base_url: Option<String>,
    pub is_active: bool,
    pub single_session: bool,
}

#[derive(Debug, Error)]
pub enum IntoApplicationError {
    #[error("invalid code on application row: {0}")]
    Code(#[from] InvalidClientCode),
}

impl TryFrom<DatabaseApplication> for Application {
    type Error = IntoApplicationError;

    fn try_from(value: DatabaseApplication) -> Result<Self, Self::Error> {
        let code = ClientCode::new(&value.code)?;
        Ok(Self {
            id: value.id,
            name: value.name,
            code,
            base_url: value.base_url,
            is_active: value.is_active,
            single_session: value.single_session,
        })
    }
}

impl ApplicationRepository for Postgres {
    async fn find_application_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Application>, ApplicationRepoError> {
        let row = sqlx::query_as::<_, DatabaseApplication>(
            "SELECT id, name, code, base_url, is_active, single_session \
             FROM applications WHERE code = $1 AND deleted_at IS NULL",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApplicationRepoError::Database(e.into()))?;

        row.map(Application::try_from)
            .transpose()
            .map_err(|e| ApplicationRepoError::Database(e.into()))
    }

    async fn list_applications_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Application>, ApplicationRepoError> {
        let rows = sqlx::query_as::<_, DatabaseApplication>(
            "SELECT a.id, a.name, a.code, a.base_url, a.is_active, a.single_session \
             FROM applications a \
             JOIN user_applications ua ON ua.application_id = a.id \
             WHERE ua.user_id = $1 AND a.deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApplicationRepoError::Database(e.into()))?;

        rows.into_iter()
            .map(|row| {
                Application::try_from(row).map_err(|e| ApplicationRepoError::Database(e.into()))
            })
            .collect()
    }
}
