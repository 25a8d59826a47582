use std::str::FromStr;

use crate::domain::auth::models::token::TokenLifetimes;
use anyhow::Context;
use axum::http::HeaderValue;
use tracing::Level;

const BIND_ADDRESS_KEY: &str = "BIND_ADDRESS";
const RPC_BIND_ADDRESS_KEY: &str = "RPC_BIND_ADDRESS";
const DATABASE_URL_KEY: &str = "DATABASE_URL";
const REDIS_URL_KEY: &str = "REDIS_URL";
const RUST_LOG_KEY: &str = "RUST_LOG";
const ALLOWED_ORIGINS_KEY: &str = "ALLOWED_ORIGINS";

const JWT_PRIVATE_KEY_PATH_KEY: &str = "JWT_PRIVATE_KEY_PATH";
const JWT_PUBLIC_KEY_PATH_KEY: &str = "JWT_PUBLIC_KEY_PATH";
const ACCESS_TOKEN_EXPIRE_MINUTES_KEY: &str = "ACCESS_TOKEN_EXPIRE_MINUTES";
const REFRESH_TOKEN_EXPIRE_DAYS_KEY: &str = "REFRESH_TOKEN_EXPIRE_DAYS";
const MAX_ACTIVE_SESSIONS_KEY: &str = "MAX_ACTIVE_SESSIONS";

const FIREBASE_API_KEY_KEY: &str = "FIREBASE_API_KEY";
const GOOGLE_CLIENT_ID_KEY: &str = "GOOGLE_CLIENT_ID";
const GOOGLE_CLIENT_SECRET_KEY: &str = "GOOGLE_CLIENT_SECRET";
const GOOGLE_REDIRECT_URI_KEY: &str = "GOOGLE_REDIRECT_URI";

pub struct Config {
    pub bind_address: String,
    pub rpc_bind_address: String,
    pub database_url: String,
    pub redis_url: String,
    pub rust_log: Level,
    pub allowed_origins: Vec<HeaderValue>,
    pub jwt_private_key_path: String,
    pub jwt_public_key_path: String,
    pub token_lifetimes: TokenLifetimes,
    pub max_active_sessions: usize,
    pub firebase_api_key: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let bind_address = env_var_or(BIND_ADDRESS_KEY, "0.0.0.0:8000");
        let rpc_bind_address = env_var_or(RPC_BIND_ADDRESS_KEY, "0.0.0.0:50051");
        let database_url = env_var_by_key(DATABASE_URL_KEY)?;
        let redis_url = env_var_or(REDIS_URL_KEY, "redis://localhost:6379/0");
        let rust_log = Level::from_str(&env_var_or(RUST_LOG_KEY, "info"))?;
        let allowed_origins: Vec<HeaderValue> = env_var_or(ALLOWED_ORIGINS_KEY, "http://localhost:3000")
            .split(',')
            .map(|x| x.trim().parse())
            .collect::<Result<Vec<HeaderValue>, _>>()
            .context("invalid allowed origins from env")?;
        let jwt_private_key_path = env_var_or(JWT_PRIVATE_KEY_PATH_KEY, "./jwt_private.pem");
        let jwt_public_key_path = env_var_or(JWT_PUBLIC_KEY_PATH_KEY, "./jwt_public.pem");
        let token_lifetimes = TokenLifetimes {
            access_minutes: parse_env_var_or(ACCESS_TOKEN_EXPIRE_MINUTES_KEY, 30)?,
            refresh_days: parse_env_var_or(REFRESH_TOKEN_EXPIRE_DAYS_KEY, 60)?,
        };
        let max_active_sessions = parse_env_var_or(MAX_ACTIVE_SESSIONS_KEY, 5)?;
        let firebase_api_key = env_var_or(FIREBASE_API_KEY_KEY, "");
        let google_client_id = env_var_or(GOOGLE_CLIENT_ID_KEY, "");
        let google_client_secret = env_var_or(GOOGLE_CLIENT_SECRET_KEY, "");
        let google_redirect_uri = env_var_or(
            GOOGLE_REDIRECT_URI_KEY,
            "http://localhost:8000/api/v1/auth/login/google/callback",
        );
        Ok(Self {
            bind_address,
            rpc_bind_address,
            database_url,
            redis_url,
            rust_log,
            allowed_origins,
            jwt_private_key_path,
            jwt_public_key_path,
            token_lifetimes,
            max_active_sessions,
            firebase_api_key,
            google_client_id,
            google_client_secret,
            google_redirect_uri,
        })
    }
}

fn env_var_by_key(key: &str) -> anyhow::Result<String> {
    std::env::var(key).context(format!("failed to get variable from env: {}", key))
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_var_or<T: FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .context(format!("failed to parse variable from env: {}", key)),
        Err(_) => Ok(default),
    }
}
