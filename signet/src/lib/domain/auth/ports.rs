//! Port traits for the authentication flows.
//!
//! Repositories and external verifiers are ports so the orchestrator can be
//! tested against in-memory doubles; the real adapters live under
//! `outbound/` (PostgreSQL, the identity broker, the OAuth provider).

use std::future::Future;
use uuid::Uuid;

use crate::domain::auth::models::{
    login::{
        EmailLogin, ExchangeSsoToken, FirebaseLogin, GoogleAuthUrl, GoogleCallback, LoginError,
    },
    logout::{Logout, LogoutError},
    outcome::{LoginOutcome, RefreshOutcome, UserData},
    refresh::{RefreshAccessToken, RefreshError},
    token::{TokenError, TokenKeys},
    AuthBinding, BindingError, ExternalIdentity, ProviderKind,
};
use crate::domain::session::{models::SessionRecord, ports::CacheError};

/// Database port for auth-provider bindings.
pub trait AuthProviderRepository: Clone + Send + Sync + 'static {
    /// Finds a binding by (provider kind, provider-scoped subject id).
    fn find_binding(
        &self,
        provider: ProviderKind,
        provider_user_id: &str,
    ) -> impl Future<Output = Result<Option<AuthBinding>, BindingError>> + Send;

    /// Links a new binding to an existing user. Never creates users.
    fn link_binding(
        &self,
        user_id: Uuid,
        provider: ProviderKind,
        provider_user_id: &str,
    ) -> impl Future<Output = Result<AuthBinding, BindingError>> + Send;

    /// Bumps a binding's `last_used_at` after a successful login.
    fn touch_binding(
        &self,
        binding_id: Uuid,
    ) -> impl Future<Output = Result<(), BindingError>> + Send;
}

/// The external identity broker: hand it an ID token, get back a verified
/// identity or a refusal. Everything else about the broker is out of scope.
pub trait IdentityBroker: Clone + Send + Sync + 'static {
    fn verify_id_token(
        &self,
        id_token: &str,
    ) -> impl Future<Output = Result<ExternalIdentity, BrokerError>> + Send;
}

/// The classical authorization-code OAuth provider.
pub trait OAuthClient: Clone + Send + Sync + 'static {
    /// Builds the provider's authorization URL. Pure.
    fn authorization_url(&self, redirect_uri: &str, state: Option<&str>) -> String;

    /// Exchanges the code and fetches userinfo.
    fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> impl Future<Output = Result<ExternalIdentity, BrokerError>> + Send;
}

/// Failure from an external verifier.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The provider looked at the credential and said no.
    #[error("credential rejected by provider: {0}")]
    Rejected(String),

    /// The provider could not be reached or answered garbage.
    #[error(transparent)]
    Unavailable(#[from] anyhow::Error),
}

/// Service port for the flow orchestrator. Implemented by
/// `services::Service`; consumed by the HTTP and RPC surfaces.
pub trait AuthService: Clone + Send + Sync + 'static {
    /// The process-wide token codec, shared with the bearer-auth extractor
    /// and the JWKS endpoint.
    fn token_keys(&self) -> &TokenKeys;

    fn login_with_email(
        &self,
        request: &EmailLogin,
    ) -> impl Future<Output = Result<LoginOutcome, LoginError>> + Send;

    fn login_with_firebase(
        &self,
        request: &FirebaseLogin,
    ) -> impl Future<Output = Result<LoginOutcome, LoginError>> + Send;

    /// Builds the Google authorization URL for the frontend redirect.
    fn google_authorization_url(&self, request: &GoogleAuthUrl) -> String;

    fn login_with_google(
        &self,
        request: &GoogleCallback,
    ) -> impl Future<Output = Result<LoginOutcome, LoginError>> + Send;

    /// Exchanges a live SSO token for app-scoped tokens. The SSO session is
    /// not rotated.
    fn exchange_sso_token(
        &self,
        request: &ExchangeSsoToken,
    ) -> impl Future<Output = Result<LoginOutcome, LoginError>> + Send;

    /// Rotates a refresh token. The old token stops working.
    fn refresh_token(
        &self,
        request: &RefreshAccessToken,
    ) -> impl Future<Output = Result<RefreshOutcome, RefreshError>> + Send;

    /// Claims-only access-token validation. No session lookup by design:
    /// revocation takes effect at the next refresh.
    fn verify_access_token(&self, access_token: &str) -> Result<UserData, TokenError>;

    fn logout(&self, request: &Logout) -> impl Future<Output = Result<(), LogoutError>> + Send;

    fn list_sessions(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Vec<SessionRecord>, CacheError>> + Send;
}
