use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::auth::source::{token_from_payload, TokenSource};
use crate::auth::token::Token;
use crate::error::{from_status, from_transport, Backend, PropertyError, Result};
use crate::utils::constants::DEFAULT_AUTHORITY;

/// Registered application credentials exchanged through the OAuth2
/// client-credentials grant.
#[derive(Clone)]
pub struct AppRegistrationSource {
    authority: String,
    tenant: String,
    client_id: String,
    client_secret: String,
}

impl std::fmt::Debug for AppRegistrationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRegistrationSource")
            .field("authority", &self.authority)
            .field("tenant", &self.tenant)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl AppRegistrationSource {
    pub fn new(
        tenant: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_owned(),
            tenant: tenant.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/{}/oauth2/token", self.authority.trim_end_matches('/'), self.tenant)
    }
}

#[async_trait]
impl TokenSource for AppRegistrationSource {
    fn strategy(&self) -> &'static str {
        "app_registration"
    }

    async fn acquire(&self, client: &Client, resource: &str) -> Result<Token> {
        debug!("requesting client credentials token for '{}' as '{}'", resource, self.client_id);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("resource", resource),
        ];

        let response = client
            .post(self.token_endpoint())
            .form(&form)
            .send()
            .await
            .map_err(|e| from_transport(e, "token endpoint", Backend::Identity))?;

        if !response.status().is_success() {
            return Err(from_status(response.status(), "token endpoint", Backend::Identity));
        }

        let payload: Value = response.json().await.map_err(|e| {
            PropertyError::authorization(format!("token endpoint returned malformed JSON: {}", e))
        })?;

        token_from_payload(self.strategy(), resource, &payload)
    }
}
