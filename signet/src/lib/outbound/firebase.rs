//! Firebase identity-broker adapter.
//!
//! The broker contract is narrow: hand over an ID token, get back the
//! verified identity or a refusal. Verification is delegated to the
//! Identity Toolkit `accounts:lookup` endpoint, which validates the token
//! server-side and returns the matching account.

use anyhow::{anyhow, Context};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::auth::models::ExternalIdentity;
use crate::domain::auth::ports::{BrokerError, IdentityBroker};

const LOOKUP_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// firebase identity broker client
#[derive(Debug, Clone)]
pub struct FirebaseAuth {
    http: reqwest::Client,
    api_key: String,
}

impl FirebaseAuth {
    pub fn new(api_key: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build firebase http client")?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
}

impl IdentityBroker for FirebaseAuth {
    async fn verify_id_token(&self, id_token: &str) -> Result<ExternalIdentity, BrokerError> {
        let response = self
            .http
            .post(format!("{LOOKUP_ENDPOINT}?key={}", self.api_key))
            .json(&serde_json::json!({ "idToken": id_token }))
            .send()
            .await
            .map_err(|e| BrokerError::Unavailable(anyhow!(e)))?;

        // The toolkit answers 400 for invalid or expired tokens.
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(BrokerError::Rejected("id token rejected".to_string()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| BrokerError::Unavailable(anyhow!(e)))?;

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| BrokerError::Unavailable(anyhow!(e)))?;

        let user = body
            .users
            .into_iter()
            .next()
            .ok_or_else(|| BrokerError::Rejected("no account for id token".to_string()))?;

        Ok(ExternalIdentity {
            subject_id: user.local_id,
            email: user.email,
            name: user.display_name,
            picture: user.photo_url,
        })
    }
}
