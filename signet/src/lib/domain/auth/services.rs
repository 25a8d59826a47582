//! The flow orchestrator: every login-type flow, refresh, and logout.
//!
//! Flows are strictly ordered: resolve identity, pass the access gate,
//! create the SSO session, sign tokens, persist the app session. The
//! refresh token is signed twice around session creation because the store
//! assigns the device id and that id must appear in the final token's
//! claims; the provisional hash written by create is superseded by the
//! update after the final signing.

use std::sync::Arc;

use anyhow::anyhow;
use uuid::Uuid;

use crate::domain::{
    application::{
        gate::validate_client_access,
        models::{Application, ClientAccessError, SSO_PORTAL_CLIENT},
        ports::ApplicationRepository,
    },
    auth::{
        models::{
            login::{
                EmailLogin, ExchangeSsoToken, FirebaseLogin, GoogleAuthUrl, GoogleCallback,
                LoginContext, LoginError,
            },
            logout::{Logout, LogoutError, LogoutScope},
            outcome::{LoginOutcome, RefreshOutcome, UserData, TOKEN_TYPE_BEARER},
            refresh::{RefreshAccessToken, RefreshError},
            token::{TokenError, TokenKeys},
            ExternalIdentity, ProviderKind, VerifiedIdentity,
        },
        ports::{AuthProviderRepository, AuthService, BrokerError, IdentityBroker, OAuthClient},
    },
    session::{
        models::{CreateSession, SessionRecord},
        ports::{CacheError, KeyValueStore},
        sso::SsoSessionStore,
        store::SessionStore,
    },
    user::{
        models::{GetUserError, User},
        ports::UserRepository,
    },
};

/// Structure which implements [`AuthService`].
#[derive(Clone)]
pub struct Service<R, C, B, G>
where
    R: UserRepository + AuthProviderRepository + ApplicationRepository,
    C: KeyValueStore,
    B: IdentityBroker,
    G: OAuthClient,
{
    repo: R,
    sessions: SessionStore<C>,
    sso_sessions: SsoSessionStore<C>,
    broker: B,
    oauth: G,
    keys: Arc<TokenKeys>,
}

impl<R, C, B, G> Service<R, C, B, G>
where
    R: UserRepository + AuthProviderRepository + ApplicationRepository,
    C: KeyValueStore,
    B: IdentityBroker,
    G: OAuthClient,
{
    pub fn new(
        repo: R,
        sessions: SessionStore<C>,
        sso_sessions: SsoSessionStore<C>,
        broker: B,
        oauth: G,
        keys: Arc<TokenKeys>,
    ) -> Self {
        Self {
            repo,
            sessions,
            sso_sessions,
            broker,
            oauth,
            keys,
        }
    }

    // =====================
    //  identity resolution
    // =====================

    /// Email/password preamble. Every failure collapses into
    /// `InvalidCredentials`; callers cannot distinguish an unknown email
    /// from a wrong password.
    async fn verify_password(
        &self,
        request: &EmailLogin,
    ) -> Result<VerifiedIdentity, LoginError> {
        let email = request.email.to_string();

        let user = self
            .repo
            .find_user_by_email(&email)
            .await
            .map_err(map_user_db)?
            .ok_or(LoginError::InvalidCredentials)?;

        let binding = self
            .repo
            .find_binding(ProviderKind::Email, &email)
            .await?
            .ok_or(LoginError::InvalidCredentials)?;
        let Some(password_hash) = binding.password_hash.clone() else {
            return Err(LoginError::InvalidCredentials);
        };

        // bcrypt is CPU-bound; keep it off the async workers.
        let password = request.password.clone();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
            .await
            .map_err(|e| LoginError::FailedToVerify(anyhow!(e)))?
            .map_err(|e| LoginError::FailedToVerify(anyhow!(e)))?;

        if !verified {
            return Err(LoginError::InvalidCredentials);
        }

        self.repo.touch_binding(binding.id).await?;

        Ok(VerifiedIdentity::Password { user_id: user.id })
    }

    /// Shared resolution tail: turn a verified credential into a local
    /// user. May create bindings (auto-linking), never users.
    async fn resolve_identity(&self, identity: VerifiedIdentity) -> Result<User, LoginError> {
        match identity {
            VerifiedIdentity::Password { user_id } => self
                .repo
                .get_user(user_id)
                .await
                .map_err(|e| map_get_user(e, LoginError::InvalidCredentials)),
            VerifiedIdentity::External { provider, identity } => {
                self.resolve_external(provider, identity).await
            }
        }
    }

    async fn resolve_external(
        &self,
        provider: ProviderKind,
        identity: ExternalIdentity,
    ) -> Result<User, LoginError> {
        if let Some(binding) = self
            .repo
            .find_binding(provider, &identity.subject_id)
            .await?
        {
            let user = self
                .repo
                .get_user(binding.user_id)
                .await
                .map_err(|e| map_get_user(e, LoginError::UserNotRegistered))?;
            self.repo.touch_binding(binding.id).await?;
            return Ok(user);
        }

        // No binding yet: link to an existing account by verified email.
        let Some(email) = identity.email.as_deref() else {
            return Err(LoginError::UserNotRegistered);
        };
        let user = self
            .repo
            .find_user_by_email(email)
            .await
            .map_err(map_user_db)?
            .ok_or(LoginError::UserNotRegistered)?;

        self.repo
            .link_binding(user.id, provider, &identity.subject_id)
            .await?;
        tracing::info!(user = %user.id, %provider, "auto-linked provider binding");

        if user.avatar_url.is_none() {
            if let Some(picture) = &identity.picture {
                self.adopt_avatar(user.id, picture.clone());
            }
        }

        Ok(user)
    }

    /// Best-effort, fire-and-forget: must never block or fail the login.
    fn adopt_avatar(&self, user_id: Uuid, picture: String) {
        let repo = self.repo.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.set_avatar_url(user_id, &picture).await {
                tracing::warn!(user = %user_id, error = %e, "avatar adoption failed");
            }
        });
    }

    // =============
    //  login tail
    // =============

    /// Gate, SSO session, tokens, app session. Shared by every credential
    /// path.
    async fn finish_login(
        &self,
        user: User,
        context: &LoginContext,
    ) -> Result<LoginOutcome, LoginError> {
        let client_id = context.client_id.as_ref().map(|c| c.as_str().to_string());
        let app = validate_client_access(&self.repo, user.id, client_id.as_deref()).await?;

        let sso_token = self
            .sso_sessions
            .create(user.id, context.ip_address.as_deref())
            .await?;

        self.issue_outcome(user, sso_token, app, context).await
    }

    async fn issue_outcome(
        &self,
        user: User,
        sso_token: String,
        app: Option<Application>,
        context: &LoginContext,
    ) -> Result<LoginOutcome, LoginError> {
        let assigned = self
            .repo
            .list_applications_for_user(user.id)
            .await
            .map_err(|e| LoginError::ClientAccess(e.into()))?;
        let allowed_codes: Vec<String> = assigned
            .iter()
            .filter(|a| a.is_active)
            .map(|a| a.code.to_string())
            .collect();
        let user_data = UserData::from_user(&user, &assigned);

        let Some(app) = app else {
            // SSO-only: portal-scoped tokens, no app session, no device id.
            let access_token = self.keys.sign_access_token(&user, allowed_codes, None)?;
            let refresh_token = self.keys.sign_refresh_token(&user, None, None)?;

            tracing::info!(user = %user.id, apps = user_data.allowed_apps.len(), "sso login");

            return Ok(LoginOutcome {
                sso_token,
                access_token: Some(access_token),
                refresh_token: Some(refresh_token),
                device_id: None,
                token_type: TOKEN_TYPE_BEARER.to_string(),
                expires_in: Some(self.keys.lifetimes().access_seconds()),
                user: user_data,
            });
        };

        let client = app.code.as_str();

        // The device id is assigned inside create and must appear in the
        // refresh claims, hence the provisional sign + re-sign.
        let provisional = self.keys.sign_refresh_token(&user, Some(client), None)?;
        let device_id = self
            .sessions
            .create(&CreateSession {
                user_id: user.id,
                client_id: client.to_string(),
                refresh_token: provisional,
                single_session: app.single_session,
                device_id: context.device_id.clone(),
                device_info: context.device_info.clone(),
                ip_address: context.ip_address.clone(),
                fcm_token: context.fcm_token.clone(),
            })
            .await?;

        let refresh_token = self
            .keys
            .sign_refresh_token(&user, Some(client), Some(&device_id))?;
        self.sessions
            .update(user.id, client, &device_id, Some(&refresh_token), None)
            .await?;

        let access_token = self
            .keys
            .sign_access_token(&user, allowed_codes, Some(client))?;

        tracing::info!(user = %user.id, client, device = %device_id, "app login");

        Ok(LoginOutcome {
            sso_token,
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            device_id: Some(device_id),
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: Some(self.keys.lifetimes().access_seconds()),
            user: user_data,
        })
    }
}

impl<R, C, B, G> AuthService for Service<R, C, B, G>
where
    R: UserRepository + AuthProviderRepository + ApplicationRepository,
    C: KeyValueStore,
    B: IdentityBroker,
    G: OAuthClient,
{
    fn token_keys(&self) -> &TokenKeys {
        &self.keys
    }

    async fn login_with_email(&self, request: &EmailLogin) -> Result<LoginOutcome, LoginError> {
        tracing::info!(email = %request.email, "email login attempt");
        let identity = self.verify_password(request).await?;
        let user = self.resolve_identity(identity).await?;
        self.finish_login(user, &request.context).await
    }

    async fn login_with_firebase(
        &self,
        request: &FirebaseLogin,
    ) -> Result<LoginOutcome, LoginError> {
        tracing::info!("firebase login attempt");
        let identity = self
            .broker
            .verify_id_token(&request.firebase_token)
            .await
            .map_err(map_broker)?;
        let user = self
            .resolve_identity(VerifiedIdentity::External {
                provider: ProviderKind::Firebase,
                identity,
            })
            .await?;
        self.finish_login(user, &request.context).await
    }

    fn google_authorization_url(&self, request: &GoogleAuthUrl) -> String {
        self.oauth
            .authorization_url(&request.redirect_uri, request.state.as_deref())
    }

    async fn login_with_google(&self, request: &GoogleCallback) -> Result<LoginOutcome, LoginError> {
        tracing::info!("google oauth callback");
        let identity = self
            .oauth
            .exchange_code(&request.code, request.redirect_uri.as_deref())
            .await
            .map_err(map_broker)?;
        let user = self
            .resolve_identity(VerifiedIdentity::External {
                provider: ProviderKind::Google,
                identity,
            })
            .await?;
        self.finish_login(user, &request.context).await
    }

    async fn exchange_sso_token(
        &self,
        request: &ExchangeSsoToken,
    ) -> Result<LoginOutcome, LoginError> {
        tracing::info!(client = %request.client_id, "sso token exchange");

        let sso = self
            .sso_sessions
            .validate(&request.sso_token)
            .await?
            .ok_or(LoginError::InvalidSsoSession)?;

        let user = self
            .repo
            .get_user(sso.user_id)
            .await
            .map_err(|e| map_get_user(e, LoginError::InvalidSsoSession))?;

        let app = validate_client_access(&self.repo, user.id, Some(request.client_id.as_str()))
            .await?
            .ok_or_else(|| {
                LoginError::ClientAccess(ClientAccessError::AppNotFound(
                    request.client_id.to_string(),
                ))
            })?;

        // The SSO session is deliberately not rotated here; the caller's
        // token keeps working.
        let context = LoginContext {
            client_id: Some(request.client_id.clone()),
            device_id: request.device_id.clone(),
            device_info: request.device_info.clone(),
            ip_address: request.ip_address.clone(),
            fcm_token: request.fcm_token.clone(),
        };
        self.issue_outcome(user, request.sso_token.clone(), Some(app), &context)
            .await
    }

    async fn refresh_token(
        &self,
        request: &RefreshAccessToken,
    ) -> Result<RefreshOutcome, RefreshError> {
        let claims = self
            .keys
            .verify_refresh(&request.refresh_token)
            .map_err(|e| {
                tracing::info!(error = %e, "refresh token rejected");
                RefreshError::InvalidToken
            })?;

        let client_id = claims
            .client_id
            .clone()
            .unwrap_or_else(|| SSO_PORTAL_CLIENT.to_string());

        if let Some(token_device) = &claims.device_id {
            if token_device != &request.device_id {
                tracing::warn!(user = %claims.sub, "refresh device id mismatch");
                return Err(RefreshError::InvalidToken);
            }
        }

        let valid = self
            .sessions
            .validate_refresh_token(
                claims.sub,
                &client_id,
                &request.device_id,
                &request.refresh_token,
            )
            .await?;
        if !valid {
            return Err(RefreshError::InvalidToken);
        }

        let user = self.repo.get_user(claims.sub).await.map_err(|e| match e {
            GetUserError::NotFound => RefreshError::InvalidToken,
            GetUserError::Database(e) => RefreshError::Database(e),
        })?;

        let assigned = self
            .repo
            .list_applications_for_user(user.id)
            .await
            .map_err(|e| match e {
                crate::domain::application::models::ApplicationRepoError::Database(e) => {
                    RefreshError::Database(e)
                }
            })?;
        let allowed_codes: Vec<String> = assigned
            .iter()
            .filter(|a| a.is_active)
            .map(|a| a.code.to_string())
            .collect();

        let access_token = self
            .keys
            .sign_access_token(&user, allowed_codes, Some(&client_id))
            .map_err(RefreshError::Token)?;
        let refresh_token = self
            .keys
            .sign_refresh_token(&user, Some(&client_id), Some(&request.device_id))
            .map_err(RefreshError::Token)?;

        // Rotation: the stored hash now matches only the new token.
        self.sessions
            .update(
                user.id,
                &client_id,
                &request.device_id,
                Some(&refresh_token),
                None,
            )
            .await?;

        tracing::info!(user = %user.id, client = %client_id, device = %request.device_id, "token refreshed");

        Ok(RefreshOutcome {
            access_token,
            refresh_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.keys.lifetimes().access_seconds(),
        })
    }

    fn verify_access_token(&self, access_token: &str) -> Result<UserData, TokenError> {
        let claims = self.keys.verify_access(access_token)?;
        Ok(UserData::from_access_claims(&claims))
    }

    async fn logout(&self, request: &Logout) -> Result<(), LogoutError> {
        let user_id = request.user_id;
        match &request.scope {
            LogoutScope::All => {
                self.sessions.delete_all(user_id).await?;
                self.sso_sessions.delete(user_id).await?;
                tracing::info!(user = %user_id, "logged out everywhere");
            }
            LogoutScope::SsoOnly => {
                self.sso_sessions.delete(user_id).await?;
                self.sessions
                    .delete_client(user_id, SSO_PORTAL_CLIENT)
                    .await?;
                tracing::info!(user = %user_id, "sso session deleted");
            }
            LogoutScope::Client(client_id) => {
                self.sessions
                    .delete_client(user_id, client_id.as_str())
                    .await?;
                tracing::info!(user = %user_id, client = %client_id, "client logout");
            }
            LogoutScope::ClientDevice {
                client_id,
                device_id,
            } => {
                self.sessions
                    .delete_device(user_id, client_id.as_str(), device_id)
                    .await?;
                tracing::info!(user = %user_id, client = %client_id, device = %device_id, "device logout");
            }
        }
        Ok(())
    }

    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<SessionRecord>, CacheError> {
        self.sessions.list_all(user_id).await
    }
}

fn map_user_db(error: GetUserError) -> LoginError {
    map_get_user(error, LoginError::InvalidCredentials)
}

fn map_get_user(error: GetUserError, not_found: LoginError) -> LoginError {
    match error {
        GetUserError::NotFound => not_found,
        GetUserError::Database(e) => LoginError::Database(e),
    }
}

fn map_broker(error: BrokerError) -> LoginError {
    match error {
        BrokerError::Rejected(reason) => {
            tracing::info!(reason, "external credential rejected");
            LoginError::InvalidCredentials
        }
        BrokerError::Unavailable(e) => LoginError::Broker(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::application::models::ClientCode;
    use crate::domain::auth::models::token::tests::test_keys;
    use crate::domain::auth::models::token::TokenType;
    use crate::domain::auth::models::AuthBinding;
    use crate::domain::session::memory::InMemoryStore;
    use crate::domain::user::models::{UserRole, UserStatus};
    use chrono::Utc;
    use email_address::EmailAddress;
    use std::collections::HashMap;
    use std::str::FromStr;
    use std::sync::{Arc, Mutex};

    // ==============
    //  test doubles
    // ==============

    #[derive(Default)]
    struct MockData {
        users: HashMap<Uuid, User>,
        bindings: Vec<AuthBinding>,
        apps: Vec<Application>,
        user_apps: HashMap<Uuid, Vec<Uuid>>,
    }

    #[derive(Clone, Default)]
    struct MockRepo {
        inner: Arc<Mutex<MockData>>,
    }

    impl MockRepo {
        fn lock(&self) -> std::sync::MutexGuard<'_, MockData> {
            self.inner.lock().unwrap()
        }
    }

    impl UserRepository for MockRepo {
        async fn get_user(&self, user_id: Uuid) -> Result<User, GetUserError> {
            self.lock()
                .users
                .get(&user_id)
                .filter(|u| u.status == UserStatus::Active)
                .cloned()
                .ok_or(GetUserError::NotFound)
        }

        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, GetUserError> {
            Ok(self
                .lock()
                .users
                .values()
                .find(|u| {
                    u.status == UserStatus::Active
                        && u.email.as_ref().is_some_and(|e| e.as_str() == email)
                })
                .cloned())
        }

        async fn set_avatar_url(&self, user_id: Uuid, avatar_url: &str) -> Result<(), GetUserError> {
            let mut data = self.lock();
            let user = data.users.get_mut(&user_id).ok_or(GetUserError::NotFound)?;
            user.avatar_url = Some(avatar_url.to_string());
            Ok(())
        }
    }

    impl AuthProviderRepository for MockRepo {
        async fn find_binding(
            &self,
            provider: ProviderKind,
            provider_user_id: &str,
        ) -> Result<Option<AuthBinding>, crate::domain::auth::models::BindingError> {
            Ok(self
                .lock()
                .bindings
                .iter()
                .find(|b| b.provider == provider && b.provider_user_id == provider_user_id)
                .cloned())
        }

        async fn link_binding(
            &self,
            user_id: Uuid,
            provider: ProviderKind,
            provider_user_id: &str,
        ) -> Result<AuthBinding, crate::domain::auth::models::BindingError> {
            let binding = AuthBinding {
                id: Uuid::new_v4(),
                user_id,
                provider,
                provider_user_id: provider_user_id.to_string(),
                password_hash: None,
                last_used_at: None,
            };
            self.lock().bindings.push(binding.clone());
            Ok(binding)
        }

        async fn touch_binding(
            &self,
            binding_id: Uuid,
        ) -> Result<(), crate::domain::auth::models::BindingError> {
            if let Some(binding) = self.lock().bindings.iter_mut().find(|b| b.id == binding_id) {
                binding.last_used_at = Some(Utc::now().naive_utc());
            }
            Ok(())
        }
    }

    impl ApplicationRepository for MockRepo {
        async fn find_application_by_code(
            &self,
            code: &str,
        ) -> Result<Option<Application>, crate::domain::application::models::ApplicationRepoError>
        {
            Ok(self
                .lock()
                .apps
                .iter()
                .find(|a| a.code.as_str() == code)
                .cloned())
        }

        async fn list_applications_for_user(
            &self,
            user_id: Uuid,
        ) -> Result<Vec<Application>, crate::domain::application::models::ApplicationRepoError>
        {
            let data = self.lock();
            let ids = data.user_apps.get(&user_id).cloned().unwrap_or_default();
            Ok(data
                .apps
                .iter()
                .filter(|a| ids.contains(&a.id))
                .cloned()
                .collect())
        }
    }

    #[derive(Clone, Default)]
    struct StubBroker {
        identities: Arc<Mutex<HashMap<String, ExternalIdentity>>>,
    }

    impl IdentityBroker for StubBroker {
        async fn verify_id_token(&self, id_token: &str) -> Result<ExternalIdentity, BrokerError> {
            self.identities
                .lock()
                .unwrap()
                .get(id_token)
                .cloned()
                .ok_or_else(|| BrokerError::Rejected("unknown id token".to_string()))
        }
    }

    #[derive(Clone, Default)]
    struct StubOAuth {
        codes: Arc<Mutex<HashMap<String, ExternalIdentity>>>,
    }

    impl OAuthClient for StubOAuth {
        fn authorization_url(&self, redirect_uri: &str, state: Option<&str>) -> String {
            format!(
                "https://accounts.example.com/auth?redirect_uri={redirect_uri}&state={}",
                state.unwrap_or_default()
            )
        }

        async fn exchange_code(
            &self,
            code: &str,
            _redirect_uri: Option<&str>,
        ) -> Result<ExternalIdentity, BrokerError> {
            self.codes
                .lock()
                .unwrap()
                .get(code)
                .cloned()
                .ok_or_else(|| BrokerError::Rejected("unknown code".to_string()))
        }
    }

    // ==========
    //  fixtures
    // ==========

    type TestService = Service<MockRepo, InMemoryStore, StubBroker, StubOAuth>;

    struct Fixture {
        service: TestService,
        repo: MockRepo,
        broker: StubBroker,
        oauth: StubOAuth,
        cache: InMemoryStore,
        user: User,
    }

    fn app(code: &str, active: bool, single_session: bool) -> Application {
        Application {
            id: Uuid::new_v4(),
            name: code.to_uppercase(),
            code: ClientCode::new(code).unwrap(),
            base_url: None,
            is_active: active,
            single_session,
        }
    }

    fn fixture() -> Fixture {
        let repo = MockRepo::default();
        let broker = StubBroker::default();
        let oauth = StubOAuth::default();
        let cache = InMemoryStore::new();
        let keys = Arc::new(test_keys());

        let user = User {
            id: Uuid::new_v4(),
            name: "Ada Lovelace".to_string(),
            email: Some(EmailAddress::from_str("a@x.io").unwrap()),
            phone: None,
            avatar_url: None,
            role: UserRole::User,
            status: UserStatus::Active,
        };

        let hris = app("hris", true, false);
        let payroll = app("payroll", true, false);
        let kiosk = app("kiosk", true, true);
        let dormant = app("dormant", false, false);

        {
            let mut data = repo.lock();
            data.users.insert(user.id, user.clone());
            data.bindings.push(AuthBinding {
                id: Uuid::new_v4(),
                user_id: user.id,
                provider: ProviderKind::Email,
                provider_user_id: "a@x.io".to_string(),
                password_hash: Some(bcrypt::hash("good-password", 4).unwrap()),
                last_used_at: None,
            });
            data.user_apps.insert(
                user.id,
                vec![hris.id, payroll.id, kiosk.id, dormant.id],
            );
            data.apps = vec![hris, payroll, kiosk, dormant];
        }

        let service = Service::new(
            repo.clone(),
            SessionStore::new(cache.clone(), 3600, 5),
            SsoSessionStore::new(cache.clone()),
            broker.clone(),
            oauth.clone(),
            keys,
        );

        Fixture {
            service,
            repo,
            broker,
            oauth,
            cache,
            user,
        }
    }

    fn email_login(client_id: Option<&str>, device_id: Option<&str>) -> EmailLogin {
        EmailLogin::new(
            "a@x.io",
            "good-password",
            LoginContext::new(
                client_id,
                device_id.map(str::to_string),
                None,
                Some("10.0.0.1".to_string()),
                None,
            )
            .unwrap(),
        )
        .unwrap()
    }

    // =======================
    //  scenario: sso login
    // =======================

    #[tokio::test]
    async fn test_email_login_sso_only() {
        let f = fixture();

        let outcome = f
            .service
            .login_with_email(&email_login(None, None))
            .await
            .unwrap();

        assert!(!outcome.sso_token.is_empty());
        assert!(outcome.device_id.is_none());

        let keys = f.service.token_keys();
        let access = keys
            .verify_access(outcome.access_token.as_deref().unwrap())
            .unwrap();
        assert_eq!(access.sub, f.user.id);
        assert_eq!(access.role, UserRole::User);
        assert_eq!(access.token_type, TokenType::Access);
        assert_eq!(access.client_id, None);
        assert_eq!(
            access.allowed_apps,
            Some(vec!["hris".to_string(), "payroll".to_string(), "kiosk".to_string()])
        );

        let refresh = keys
            .verify_refresh(outcome.refresh_token.as_deref().unwrap())
            .unwrap();
        assert_eq!(refresh.client_id, None);
        assert_eq!(refresh.device_id, None);

        // Inactive apps are not advertised.
        assert!(!outcome.user.allowed_apps.iter().any(|a| a.code == "dormant"));
    }

    // =========================
    //  scenario: app login
    // =========================

    #[tokio::test]
    async fn test_email_login_into_app() {
        let f = fixture();

        let outcome = f
            .service
            .login_with_email(&email_login(Some("hris"), None))
            .await
            .unwrap();

        let device_id = outcome.device_id.clone().unwrap();
        let keys = f.service.token_keys();

        let access = keys
            .verify_access(outcome.access_token.as_deref().unwrap())
            .unwrap();
        assert_eq!(access.client_id.as_deref(), Some("hris"));
        assert!(access
            .allowed_apps
            .as_ref()
            .unwrap()
            .contains(&"hris".to_string()));

        let refresh = keys
            .verify_refresh(outcome.refresh_token.as_deref().unwrap())
            .unwrap();
        assert_eq!(refresh.client_id.as_deref(), Some("hris"));
        assert_eq!(refresh.device_id.as_deref(), Some(device_id.as_str()));

        // A session exists under the triple and validates the final token.
        let sessions = f.service.list_sessions(f.user.id).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].client_id, "hris");
        assert_eq!(sessions[0].device_id, device_id);

        let store = SessionStore::new(f.cache.clone(), 3600, 5);
        assert!(store
            .validate_refresh_token(
                f.user.id,
                "hris",
                &device_id,
                outcome.refresh_token.as_deref().unwrap()
            )
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_login_to_unknown_or_inactive_app_fails() {
        let f = fixture();

        let result = f
            .service
            .login_with_email(&email_login(Some("nope"), None))
            .await;
        assert!(matches!(
            result,
            Err(LoginError::ClientAccess(ClientAccessError::AppNotFound(_)))
        ));

        let result = f
            .service
            .login_with_email(&email_login(Some("dormant"), None))
            .await;
        assert!(matches!(
            result,
            Err(LoginError::ClientAccess(ClientAccessError::AppNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
        let f = fixture();

        let wrong_password = EmailLogin::new("a@x.io", "bad-password", LoginContext::default())
            .unwrap();
        let unknown_email =
            EmailLogin::new("ghost@x.io", "good-password", LoginContext::default()).unwrap();

        let e1 = f.service.login_with_email(&wrong_password).await.unwrap_err();
        let e2 = f.service.login_with_email(&unknown_email).await.unwrap_err();

        assert!(matches!(e1, LoginError::InvalidCredentials));
        assert!(matches!(e2, LoginError::InvalidCredentials));
        assert_eq!(e1.to_string(), e2.to_string());
    }

    // ========================
    //  scenario: sso exchange
    // ========================

    #[tokio::test]
    async fn test_sso_exchange_issues_app_tokens_without_rotating_sso() {
        let f = fixture();

        let login = f
            .service
            .login_with_email(&email_login(None, None))
            .await
            .unwrap();

        let exchange = f
            .service
            .exchange_sso_token(
                &ExchangeSsoToken::new(&login.sso_token, "payroll", None, None, None, None)
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(exchange.sso_token, login.sso_token);
        let keys = f.service.token_keys();
        let access = keys
            .verify_access(exchange.access_token.as_deref().unwrap())
            .unwrap();
        assert_eq!(access.client_id.as_deref(), Some("payroll"));
        assert!(exchange.device_id.is_some());

        // The original token still validates afterwards.
        let sso = SsoSessionStore::new(f.cache.clone());
        assert!(sso.validate(&login.sso_token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sso_exchange_refuses_unpermitted_app() {
        let f = fixture();

        // A valid SSO token for a user not assigned to "intranet".
        {
            let mut data = f.repo.lock();
            let other = app("intranet", true, false);
            data.apps.push(other);
        }
        let login = f
            .service
            .login_with_email(&email_login(None, None))
            .await
            .unwrap();

        let result = f
            .service
            .exchange_sso_token(
                &ExchangeSsoToken::new(&login.sso_token, "intranet", None, None, None, None)
                    .unwrap(),
            )
            .await;

        assert!(matches!(
            result,
            Err(LoginError::ClientAccess(ClientAccessError::AppNotPermitted(_)))
        ));
    }

    #[tokio::test]
    async fn test_sso_exchange_with_bogus_token_fails() {
        let f = fixture();
        let result = f
            .service
            .exchange_sso_token(
                &ExchangeSsoToken::new("bogus", "hris", None, None, None, None).unwrap(),
            )
            .await;
        assert!(matches!(result, Err(LoginError::InvalidSsoSession)));
    }

    // ====================
    //  scenario: refresh
    // ====================

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let f = fixture();

        let login = f
            .service
            .login_with_email(&email_login(Some("hris"), None))
            .await
            .unwrap();
        let device_id = login.device_id.clone().unwrap();
        let first_refresh = login.refresh_token.clone().unwrap();

        // iat has second resolution; a same-second rotation would mint a
        // byte-identical token.
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        let outcome = f
            .service
            .refresh_token(&RefreshAccessToken::new(&first_refresh, &device_id).unwrap())
            .await
            .unwrap();
        assert_ne!(outcome.refresh_token, first_refresh);
        assert_eq!(outcome.expires_in, 30 * 60);

        // The old token is dead after exactly one successful refresh.
        let replay = f
            .service
            .refresh_token(&RefreshAccessToken::new(&first_refresh, &device_id).unwrap())
            .await;
        assert!(matches!(replay, Err(RefreshError::InvalidToken)));

        // The new token keeps working.
        let again = f
            .service
            .refresh_token(&RefreshAccessToken::new(&outcome.refresh_token, &device_id).unwrap())
            .await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_device_mismatch() {
        let f = fixture();

        let login = f
            .service
            .login_with_email(&email_login(Some("hris"), Some("d1")))
            .await
            .unwrap();

        let result = f
            .service
            .refresh_token(
                &RefreshAccessToken::new(login.refresh_token.as_deref().unwrap(), "d2").unwrap(),
            )
            .await;
        assert!(matches!(result, Err(RefreshError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let f = fixture();

        let login = f
            .service
            .login_with_email(&email_login(Some("hris"), Some("d1")))
            .await
            .unwrap();

        let result = f
            .service
            .refresh_token(
                &RefreshAccessToken::new(login.access_token.as_deref().unwrap(), "d1").unwrap(),
            )
            .await;
        assert!(matches!(result, Err(RefreshError::InvalidToken)));
    }

    // ===========================
    //  scenario: single session
    // ===========================

    #[tokio::test]
    async fn test_single_session_app_blocks_second_device() {
        let f = fixture();

        f.service
            .login_with_email(&email_login(Some("kiosk"), Some("d1")))
            .await
            .unwrap();

        let second = f
            .service
            .login_with_email(&email_login(Some("kiosk"), Some("d2")))
            .await;
        assert!(matches!(second, Err(LoginError::AlreadyLoggedInElsewhere)));

        // Same device logs in again fine, replacing its session.
        let repeat = f
            .service
            .login_with_email(&email_login(Some("kiosk"), Some("d1")))
            .await;
        assert!(repeat.is_ok());

        let sessions = f.service.list_sessions(f.user.id).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].device_id, "d1");
    }

    // ==========================
    //  scenario: global logout
    // ==========================

    #[tokio::test]
    async fn test_logout_all_invalidates_everything_but_issued_access_tokens() {
        let f = fixture();

        let hris = f
            .service
            .login_with_email(&email_login(Some("hris"), None))
            .await
            .unwrap();
        let exchange = f
            .service
            .exchange_sso_token(
                &ExchangeSsoToken::new(&hris.sso_token, "payroll", None, None, None, None)
                    .unwrap(),
            )
            .await
            .unwrap();

        f.service
            .logout(&Logout::new(f.user.id, LogoutScope::All))
            .await
            .unwrap();

        assert!(f.service.list_sessions(f.user.id).await.unwrap().is_empty());

        let sso = SsoSessionStore::new(f.cache.clone());
        assert!(sso.validate(&hris.sso_token).await.unwrap().is_none());

        for (token, device) in [
            (hris.refresh_token.clone().unwrap(), hris.device_id.clone().unwrap()),
            (
                exchange.refresh_token.clone().unwrap(),
                exchange.device_id.clone().unwrap(),
            ),
        ] {
            let result = f
                .service
                .refresh_token(&RefreshAccessToken::new(&token, &device).unwrap())
                .await;
            assert!(matches!(result, Err(RefreshError::InvalidToken)));
        }

        // Documented behavior: already-issued access tokens verify until
        // their own expiry.
        assert!(f
            .service
            .verify_access_token(hris.access_token.as_deref().unwrap())
            .is_ok());

        // Logout is idempotent.
        f.service
            .logout(&Logout::new(f.user.id, LogoutScope::All))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_logout_sso_keeps_app_sessions() {
        let f = fixture();

        let login = f
            .service
            .login_with_email(&email_login(Some("hris"), None))
            .await
            .unwrap();

        f.service
            .logout(&Logout::new(f.user.id, LogoutScope::SsoOnly))
            .await
            .unwrap();

        let sso = SsoSessionStore::new(f.cache.clone());
        assert!(sso.validate(&login.sso_token).await.unwrap().is_none());

        // The hris session survives and its refresh token still rotates.
        let result = f
            .service
            .refresh_token(
                &RefreshAccessToken::new(
                    login.refresh_token.as_deref().unwrap(),
                    login.device_id.as_deref().unwrap(),
                )
                .unwrap(),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_logout_client_device_only_touches_that_device() {
        let f = fixture();

        f.service
            .login_with_email(&email_login(Some("hris"), Some("d1")))
            .await
            .unwrap();
        f.service
            .login_with_email(&email_login(Some("hris"), Some("d2")))
            .await
            .unwrap();

        f.service
            .logout(&Logout::new(
                f.user.id,
                LogoutScope::ClientDevice {
                    client_id: ClientCode::new("hris").unwrap(),
                    device_id: "d1".to_string(),
                },
            ))
            .await
            .unwrap();

        let sessions = f.service.list_sessions(f.user.id).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].device_id, "d2");
    }

    // ==========================
    //  external identity paths
    // ==========================

    #[tokio::test]
    async fn test_firebase_login_with_existing_binding() {
        let f = fixture();

        {
            let mut data = f.repo.lock();
            data.bindings.push(AuthBinding {
                id: Uuid::new_v4(),
                user_id: f.user.id,
                provider: ProviderKind::Firebase,
                provider_user_id: "firebase-uid-1".to_string(),
                password_hash: None,
                last_used_at: None,
            });
        }
        f.broker.identities.lock().unwrap().insert(
            "valid-id-token".to_string(),
            ExternalIdentity {
                subject_id: "firebase-uid-1".to_string(),
                email: Some("a@x.io".to_string()),
                name: Some("Ada".to_string()),
                picture: None,
            },
        );

        let request = FirebaseLogin::new("valid-id-token", LoginContext::default()).unwrap();
        let outcome = f.service.login_with_firebase(&request).await.unwrap();
        assert_eq!(outcome.user.id, f.user.id);
    }

    #[tokio::test]
    async fn test_firebase_login_auto_links_by_email_and_adopts_avatar() {
        let f = fixture();

        f.broker.identities.lock().unwrap().insert(
            "fresh-id-token".to_string(),
            ExternalIdentity {
                subject_id: "firebase-uid-9".to_string(),
                email: Some("a@x.io".to_string()),
                name: Some("Ada".to_string()),
                picture: Some("https://lh3.example.com/p.jpg".to_string()),
            },
        );

        let request = FirebaseLogin::new("fresh-id-token", LoginContext::default()).unwrap();
        let outcome = f.service.login_with_firebase(&request).await.unwrap();
        assert_eq!(outcome.user.id, f.user.id);

        // The binding was linked to the existing account.
        let linked = f
            .repo
            .find_binding(ProviderKind::Firebase, "firebase-uid-9")
            .await
            .unwrap();
        assert!(linked.is_some_and(|b| b.user_id == f.user.id));

        // Avatar adoption is fire-and-forget; give the task a tick.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        let user = f.repo.get_user(f.user.id).await.unwrap();
        assert_eq!(
            user.avatar_url.as_deref(),
            Some("https://lh3.example.com/p.jpg")
        );
    }

    #[tokio::test]
    async fn test_firebase_login_unregistered_identity_fails() {
        let f = fixture();

        f.broker.identities.lock().unwrap().insert(
            "stranger-token".to_string(),
            ExternalIdentity {
                subject_id: "firebase-uid-404".to_string(),
                email: Some("stranger@x.io".to_string()),
                name: None,
                picture: None,
            },
        );

        let request = FirebaseLogin::new("stranger-token", LoginContext::default()).unwrap();
        let result = f.service.login_with_firebase(&request).await;
        assert!(matches!(result, Err(LoginError::UserNotRegistered)));
    }

    #[tokio::test]
    async fn test_rejected_broker_token_reads_as_invalid_credentials() {
        let f = fixture();
        let request = FirebaseLogin::new("garbage", LoginContext::default()).unwrap();
        let result = f.service.login_with_firebase(&request).await;
        assert!(matches!(result, Err(LoginError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_google_callback_resolves_through_oauth_client() {
        let f = fixture();

        f.oauth.codes.lock().unwrap().insert(
            "auth-code-1".to_string(),
            ExternalIdentity {
                subject_id: "google-sub-1".to_string(),
                email: Some("a@x.io".to_string()),
                name: Some("Ada".to_string()),
                picture: None,
            },
        );

        let request =
            GoogleCallback::new("auth-code-1", None, LoginContext::default()).unwrap();
        let outcome = f.service.login_with_google(&request).await.unwrap();
        assert_eq!(outcome.user.id, f.user.id);

        // Linked for next time.
        let linked = f
            .repo
            .find_binding(ProviderKind::Google, "google-sub-1")
            .await
            .unwrap();
        assert!(linked.is_some());
    }

    // ===================
    //  token validation
    // ===================

    #[tokio::test]
    async fn test_verify_access_token_reconstructs_user_from_claims() {
        let f = fixture();

        let login = f
            .service
            .login_with_email(&email_login(Some("hris"), None))
            .await
            .unwrap();

        let data = f
            .service
            .verify_access_token(login.access_token.as_deref().unwrap())
            .unwrap();
        assert_eq!(data.id, f.user.id);
        assert_eq!(data.role, UserRole::User);
        assert!(data.allowed_apps.iter().any(|a| a.code == "hris"));
    }

    #[tokio::test]
    async fn test_verify_access_token_rejects_refresh_token() {
        let f = fixture();

        let login = f
            .service
            .login_with_email(&email_login(None, None))
            .await
            .unwrap();

        let result = f
            .service
            .verify_access_token(login.refresh_token.as_deref().unwrap());
        assert!(matches!(result, Err(TokenError::WrongType { .. })));
    }
}
