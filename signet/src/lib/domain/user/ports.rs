use std::future::Future;
use uuid::Uuid;

use crate::domain::user::models::{GetUserError, User};

/// Database port for user reads.
///
/// Every method only ever returns live users: rows with a `deleted` status or
/// a soft-delete timestamp are invisible to this port.
pub trait UserRepository: Clone + Send + Sync + 'static {
    /// Loads a user by id. `NotFound` covers missing and deleted rows alike.
    fn get_user(&self, user_id: Uuid) -> impl Future<Output = Result<User, GetUserError>> + Send;

    /// Looks a user up by email for the password login path.
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, GetUserError>> + Send;

    /// Stores an avatar reference adopted from an external identity
    /// provider. Best-effort; callers treat failure as non-fatal.
    fn set_avatar_url(
        &self,
        user_id: Uuid,
        avatar_url: &str,
    ) -> impl Future<Output = Result<(), GetUserError>> + Send;
}
