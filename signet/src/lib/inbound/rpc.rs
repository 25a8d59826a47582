//! Internal RPC surface for service-to-service identity checks.
//!
//! Mirrors the public auth surface with one contract difference: domain
//! failures are answered in-band as `{success: false, error}` so callers
//! never have to interpret transport status for expected outcomes. Only
//! unexpected internal failures surface as 500s.
//!
//! Listens on its own (internal) port; no CORS, no browser concerns.

pub mod handlers;

use crate::domain::auth::ports::AuthService;
use crate::domain::health::ports::HealthService;
use crate::inbound::http::AppState;
use crate::inbound::rpc::handlers::{
    exchange_sso_token, get_sessions, login_with_email, login_with_firebase, logout,
    refresh_token, validate_token,
};

use anyhow::Context;
use axum::routing::post;
use axum::Router;
use tokio::net;

/// contains configuration for the creation of an RpcServer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcServerConfig<'a> {
    pub bind_address: &'a str,
}

/// server with a router and a listener
/// for running the internal RPC surface
pub struct RpcServer {
    router: Router,
    listener: net::TcpListener,
}

impl RpcServer {
    pub async fn new(
        auth_service: impl AuthService,
        health_service: impl HealthService,
        config: RpcServerConfig<'_>,
    ) -> anyhow::Result<Self> {
        let trace_layer = tower_http::trace::TraceLayer::new_for_http().make_span_with(
            |request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                tracing::info_span!("rpc_request", method = ?request.method(), uri)
            },
        );

        let state = AppState {
            auth_service: std::sync::Arc::new(auth_service),
            health_service: std::sync::Arc::new(health_service),
        };

        let router = Router::new()
            .nest(
                "/rpc/auth",
                Router::new()
                    .route("/validate_token", post(validate_token))
                    .route("/login_with_email", post(login_with_email))
                    .route("/login_with_firebase", post(login_with_firebase))
                    .route("/refresh_token", post(refresh_token))
                    .route("/exchange_sso_token", post(exchange_sso_token))
                    .route("/logout", post(logout))
                    .route("/get_sessions", post(get_sessions)),
            )
            .layer(trace_layer)
            .with_state(state);

        let listener = net::TcpListener::bind(&config.bind_address)
            .await
            .with_context(|| format!("failed to listen on {}", config.bind_address))?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!("rpc server running on {:?}", self.listener.local_addr());
        axum::serve(self.listener, self.router)
            .await
            .context("received error from running rpc server")?;
        Ok(())
    }
}
