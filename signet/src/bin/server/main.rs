// internal
use signet::config::Config;
use signet::domain::auth::models::token::TokenKeys;
use signet::domain::session::sso::SsoSessionStore;
use signet::domain::session::store::SessionStore;
use signet::domain::{auth, health};
use signet::inbound::http::{HttpServer, HttpServerConfig};
use signet::inbound::rpc::{RpcServer, RpcServerConfig};
use signet::outbound::firebase::FirebaseAuth;
use signet::outbound::google::GoogleOAuth;
use signet::outbound::redis::Redis;
use signet::outbound::sqlx::postgres::Postgres;
// std
use std::sync::Arc;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(_) => (),
        Err(e) => tracing::error!("Main failed: {:?}", e),
    }
}

async fn run() -> anyhow::Result<()> {
    let config: Config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_max_level(config.rust_log)
        .init();

    let db = Postgres::new(&config.database_url).await?;
    let cache = Redis::new(&config.redis_url).await?;

    // Loaded once; read-only for the life of the process.
    let keys = Arc::new(TokenKeys::from_pem_files(
        &config.jwt_private_key_path,
        &config.jwt_public_key_path,
        config.token_lifetimes,
    )?);

    let sessions = SessionStore::new(
        cache.clone(),
        config.token_lifetimes.refresh_seconds(),
        config.max_active_sessions,
    );
    let sso_sessions = SsoSessionStore::new(cache.clone());

    let broker = FirebaseAuth::new(&config.firebase_api_key)?;
    let oauth = GoogleOAuth::new(
        &config.google_client_id,
        &config.google_client_secret,
        &config.google_redirect_uri,
    )?;

    let auth_service = auth::services::Service::new(
        db.clone(),
        sessions,
        sso_sessions,
        broker,
        oauth,
        keys,
    );
    let health_service = health::services::Service::new(db.clone(), cache.clone());

    let http_server = HttpServer::new(
        auth_service.clone(),
        health_service.clone(),
        HttpServerConfig {
            bind_address: &config.bind_address,
            allowed_origins: config.allowed_origins.clone(),
        },
    )
    .await?;

    let rpc_server = RpcServer::new(
        auth_service,
        health_service,
        RpcServerConfig {
            bind_address: &config.rpc_bind_address,
        },
    )
    .await?;

    tokio::try_join!(http_server.run(), rpc_server.run())?;
    Ok(())
}
