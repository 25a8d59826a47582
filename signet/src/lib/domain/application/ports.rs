use std::future::Future;
use uuid::Uuid;

use crate::domain::application::models::{Application, ApplicationRepoError};

/// Database port for application reads.
///
/// Application rows are owned by the admin plane; the auth flows only need
/// code lookups and the per-user assignment set.
pub trait ApplicationRepository: Clone + Send + Sync + 'static {
    /// Loads an application by its short code, active or not. The access
    /// gate decides what an inactive row means.
    fn find_application_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<Application>, ApplicationRepoError>> + Send;

    /// Lists the applications assigned to a user, active or not. Token
    /// claims filter on `is_active`.
    fn list_applications_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Application>, ApplicationRepoError>> + Send;
}
