//! Google OAuth authorization-code adapter.
//!
//! Implements the classical three-legged flow: build the authorization URL
//! for the browser redirect, then exchange the returned code for an access
//! token and fetch userinfo with it.

use anyhow::{anyhow, Context};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::auth::models::ExternalIdentity;
use crate::domain::auth::ports::{BrokerError, OAuthClient};

const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const OAUTH_SCOPES: &str = "openid \
    https://www.googleapis.com/auth/userinfo.email \
    https://www.googleapis.com/auth/userinfo.profile";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// google oauth2 client
#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    default_redirect_uri: String,
}

impl GoogleOAuth {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        default_redirect_uri: &str,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build google oauth http client")?;
        Ok(Self {
            http,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            default_redirect_uri: default_redirect_uri.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl OAuthClient for GoogleOAuth {
    fn authorization_url(&self, redirect_uri: &str, state: Option<&str>) -> String {
        let mut url = format!(
            "{AUTHORIZATION_ENDPOINT}?response_type=code&client_id={}&redirect_uri={}&scope={}&access_type=offline",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(OAUTH_SCOPES),
        );
        if let Some(state) = state {
            url.push_str("&state=");
            url.push_str(&urlencoding::encode(state));
        }
        url
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<ExternalIdentity, BrokerError> {
        let redirect_uri = redirect_uri.unwrap_or(&self.default_redirect_uri);

        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| BrokerError::Unavailable(anyhow!(e)))?;

        if response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNAUTHORIZED
        {
            return Err(BrokerError::Rejected(
                "authorization code rejected".to_string(),
            ));
        }
        let response = response
            .error_for_status()
            .map_err(|e| BrokerError::Unavailable(anyhow!(e)))?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BrokerError::Unavailable(anyhow!(e)))?;

        let userinfo: GoogleUserInfo = self
            .http
            .get(USERINFO_ENDPOINT)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| BrokerError::Unavailable(anyhow!(e)))?
            .error_for_status()
            .map_err(|e| BrokerError::Unavailable(anyhow!(e)))?
            .json()
            .await
            .map_err(|e| BrokerError::Unavailable(anyhow!(e)))?;

        Ok(ExternalIdentity {
            subject_id: userinfo.id,
            email: userinfo.email,
            name: userinfo.name,
            picture: userinfo.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleOAuth {
        GoogleOAuth::new(
            "client-123.apps.googleusercontent.com",
            "secret",
            "https://sso.example.com/callback",
        )
        .unwrap()
    }

    #[test]
    fn test_authorization_url_encodes_parameters() {
        let url = client().authorization_url("https://app.example.com/cb?x=1", Some("st&ate"));

        assert!(url.starts_with(AUTHORIZATION_ENDPOINT));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client-123.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb%3Fx%3D1"));
        assert!(url.contains("state=st%26ate"));
    }

    #[test]
    fn test_authorization_url_omits_absent_state() {
        let url = client().authorization_url("https://app.example.com/cb", None);
        assert!(!url.contains("state="));
    }
}
