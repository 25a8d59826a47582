// internal
pub mod handlers;
pub mod middleware;
use crate::domain::auth::ports::AuthService;
use crate::domain::health::ports::HealthService;
use crate::inbound::http::handlers::auth::{
    email_login::login_with_email,
    exchange::exchange_sso_token,
    firebase_login::login_with_firebase,
    google_login::{google_auth_url, google_callback},
    logout::{logout_all, logout_client, logout_sso},
    refresh::refresh_token,
    sessions::list_sessions,
    validate::validate_token,
};
use crate::inbound::http::handlers::health::{
    are_server_and_cache_running, are_server_and_database_running, is_server_running, root,
};
use crate::inbound::http::handlers::jwks::jwks;
// std
use std::net::SocketAddr;
use std::sync::Arc;
// external
use anyhow::Context;
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tokio::net;
use tower_http::cors::CorsLayer;

// ========
//  server
// ========

/// contains configuration for the creation of an HttpServer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServerConfig<'a> {
    pub bind_address: &'a str,
    pub allowed_origins: Vec<HeaderValue>,
}

/// contains services
#[derive(Clone)]
pub struct AppState<AS, HS>
where
    AS: AuthService,
    HS: HealthService,
{
    pub auth_service: Arc<AS>,
    pub health_service: Arc<HS>,
}

/// server with a router and a listener
/// for running the public JSON surface
pub struct HttpServer {
    router: axum::Router,
    listener: net::TcpListener,
}

impl HttpServer {
    pub async fn new(
        auth_service: impl AuthService,
        health_service: impl HealthService,
        config: HttpServerConfig<'_>,
    ) -> anyhow::Result<Self> {
        let trace_layer = tower_http::trace::TraceLayer::new_for_http().make_span_with(
            |request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                tracing::info_span!("http_request", method = ?request.method(), uri)
            },
        );

        let state = AppState {
            auth_service: Arc::new(auth_service),
            health_service: Arc::new(health_service),
        };

        let router = axum::Router::new()
            .merge(public_routes())
            .merge(private_routes())
            .layer(trace_layer)
            .layer(
                CorsLayer::new()
                    .allow_origin(config.allowed_origins)
                    .allow_methods([Method::GET, Method::POST])
                    .allow_headers([
                        header::CONTENT_TYPE,
                        header::AUTHORIZATION,
                        HeaderName::from_static("x-client-id"),
                        HeaderName::from_static("x-device-id"),
                    ]),
            )
            .with_state(state);

        let listener = net::TcpListener::bind(&config.bind_address)
            .await
            .with_context(|| format!("failed to listen on {}", config.bind_address))?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!("http server running on {:?}", self.listener.local_addr());
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .context("received error from running http server")?;
        Ok(())
    }
}

// ===========
//  api error
// ===========

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    UnprocessableEntity(String),
    InternalServerError(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UnprocessableEntity(_) => "VALIDATION_ERROR",
            ApiError::InternalServerError(_) => "INTERNAL_ERROR",
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::UnprocessableEntity(m)
            | ApiError::InternalServerError(m) => m,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        value.log_500()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = ApiErrorBody {
            error: true,
            message: self.message().to_string(),
            error_code: self.error_code().to_string(),
            details: serde_json::json!({}),
            timestamp: Utc::now().to_rfc3339(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// uniform error envelope
#[derive(Debug, Serialize, PartialEq)]
pub struct ApiErrorBody {
    pub error: bool,
    pub message: String,
    pub error_code: String,
    pub details: serde_json::Value,
    pub timestamp: String,
}

/// logs an unexpected failure and collapses it into an opaque 500
pub trait Log500 {
    fn log_500(self) -> ApiError;
}

impl<E: Into<anyhow::Error>> Log500 for E {
    fn log_500(self) -> ApiError {
        let error: anyhow::Error = self.into();
        tracing::error!(error = ?error, "internal server error");
        ApiError::InternalServerError("internal server error".to_string())
    }
}

// =============
//  api success
// =============

#[derive(Debug)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T: Serialize + PartialEq> PartialEq for ApiSuccess<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, message: &str, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(message, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> axum::response::Response {
        (self.0, self.1).into_response()
    }
}

/// success envelope mirroring the error shape's `error` discriminator
#[derive(Debug, PartialEq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    error: bool,
    message: String,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    fn new(message: &str, data: T) -> Self {
        ApiResponseBody {
            error: false,
            message: message.to_string(),
            data,
        }
    }
}

// ========
//  routes
// ========

pub fn public_routes<AS, HS>() -> Router<AppState<AS, HS>>
where
    AS: AuthService,
    HS: HealthService,
{
    Router::new()
        .route("/", get(root))
        .route("/.well-known/jwks.json", get(jwks))
        .nest(
            "/health",
            Router::new()
                .route("/server", get(is_server_running))
                .route("/database", get(are_server_and_database_running))
                .route("/cache", get(are_server_and_cache_running)),
        )
        .nest(
            "/api/v1/auth",
            Router::new()
                .route("/login/email", post(login_with_email))
                .route("/login/firebase", post(login_with_firebase))
                .route("/login/google", get(google_auth_url))
                .route("/login/google/callback", get(google_callback))
                .route("/exchange", post(exchange_sso_token))
                .route("/refresh", post(refresh_token)),
        )
}

pub fn private_routes<AS, HS>() -> Router<AppState<AS, HS>>
where
    AS: AuthService,
    HS: HealthService,
{
    Router::new().nest(
        "/api/v1/auth",
        Router::new()
            .route("/logout", post(logout_all))
            .route("/logout/sso", post(logout_sso))
            .route("/logout/client", post(logout_client))
            .route("/validate", post(validate_token))
            .route("/sessions", get(list_sessions)),
    )
}
