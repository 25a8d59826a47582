use email_address::EmailAddress;
use sqlx_macros::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::user::models::{GetUserError, User, UserRole, UserStatus};
use crate::domain::user::ports::UserRepository;
use crate::outbound::sqlx::postgres::Postgres;

/// Live-user filter shared by every query in this adapter: deleted status
/// and soft-deleted rows are invisible to the domain.
const USER_COLUMNS: &str =
    "id, name, email, phone, avatar_path, status, role FROM users \
     WHERE deleted_at IS NULL AND status != 'deleted'";

/// raw database user record (unvalidated data from `PostgreSQL`)
#[derive(Debug, Clone, FromRow)]
pub struct DatabaseUser {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar_path: Option<String>,
    pub status: String,
    pub role: String,
}

#[derive(Debug, Error)]
pub enum IntoUserError {
    #[error("invalid email on user row: {0}")]
    Email(#[from] email_address::Error),
    #[error("invalid role on user row: {0}")]
    Role(strum::ParseError),
    #[error("invalid status on user row: {0}")]
    Status(strum::ParseError),
}

impl TryFrom<DatabaseUser> for User {
    type Error = IntoUserError;

    fn try_from(value: DatabaseUser) -> Result<Self, Self::Error> {
        let email = value
            .email
            .as_deref()
            .map(EmailAddress::from_str)
            .transpose()?;
        let role = UserRole::from_str(&value.role).map_err(IntoUserError::Role)?;
        let status = UserStatus::from_str(&value.status).map_err(IntoUserError::Status)?;

        Ok(Self {
            id: value.id,
            name: value.name,
            email,
            phone: value.phone,
            avatar_url: value.avatar_path,
            role,
            status,
        })
    }
}

impl From<IntoUserError> for GetUserError {
    fn from(value: IntoUserError) -> Self {
        Self::Database(value.into())
    }
}

impl UserRepository for Postgres {
    async fn get_user(&self, user_id: Uuid) -> Result<User, GetUserError> {
        let row = sqlx::query_as::<_, DatabaseUser>(&format!(
            "SELECT {USER_COLUMNS} AND id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GetUserError::Database(e.into()))?;

        let database_user = row.ok_or(GetUserError::NotFound)?;
        Ok(database_user.try_into()?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, GetUserError> {
        let row = sqlx::query_as::<_, DatabaseUser>(&format!(
            "SELECT {USER_COLUMNS} AND email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GetUserError::Database(e.into()))?;

        row.map(User::try_from).transpose().map_err(Into::into)
    }

    async fn set_avatar_url(&self, user_id: Uuid, avatar_url: &str) -> Result<(), GetUserError> {
        sqlx::query("UPDATE users SET avatar_path = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(avatar_url)
            .execute(&self.pool)
            .await
            .map_err(|e| GetUserError::Database(e.into()))?;
        Ok(())
    }
}
