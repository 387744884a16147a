use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::env;
use tracing::{debug, warn};

use crate::auth::source::{token_from_payload, TokenSource};
use crate::auth::token::Token;
use crate::error::{from_status, from_transport, Backend, PropertyError, Result};
use crate::utils::constants::{
    ENV_IDENTITY_ENDPOINT, ENV_IDENTITY_HEADER, IDENTITY_HEADER_NAME, MANAGED_IDENTITY_API_VERSION,
};

/// Platform-managed identity: a locally bound endpoint hands out tokens
/// for any resource when presented with the shared identity header.
#[derive(Clone)]
pub struct ManagedIdentitySource {
    endpoint: String,
    identity_header: String,
}

impl std::fmt::Debug for ManagedIdentitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedIdentitySource")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ManagedIdentitySource {
    pub fn new(endpoint: impl Into<String>, identity_header: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), identity_header: identity_header.into() }
    }

    /// Read the endpoint and header from the hosting environment bindings.
    pub fn from_env() -> Result<Self> {
        let endpoint = env::var(ENV_IDENTITY_ENDPOINT).map_err(|_| {
            PropertyError::validation(format!("{} is not set", ENV_IDENTITY_ENDPOINT))
        })?;
        let header = env::var(ENV_IDENTITY_HEADER).map_err(|_| {
            PropertyError::validation(format!("{} is not set", ENV_IDENTITY_HEADER))
        })?;
        Ok(Self::new(endpoint, header))
    }

    /// True when the hosting environment exposes a managed identity.
    pub fn is_available() -> bool {
        env::var(ENV_IDENTITY_ENDPOINT).is_ok() && env::var(ENV_IDENTITY_HEADER).is_ok()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TokenSource for ManagedIdentitySource {
    fn strategy(&self) -> &'static str {
        "managed_identity"
    }

    async fn acquire(&self, client: &Client, resource: &str) -> Result<Token> {
        debug!("requesting managed identity token for '{}'", resource);
        let response = client
            .get(&self.endpoint)
            .query(&[("resource", resource), ("api-version", MANAGED_IDENTITY_API_VERSION)])
            .header(IDENTITY_HEADER_NAME, &self.identity_header)
            .send()
            .await
            .map_err(|e| from_transport(e, "identity endpoint", Backend::Identity))?;

        if !response.status().is_success() {
            return Err(from_status(response.status(), "identity endpoint", Backend::Identity));
        }

        let payload: Value = response.json().await.map_err(|e| {
            PropertyError::authorization(format!("identity endpoint returned malformed JSON: {}", e))
        })?;

        if let Some(issued_for) = payload.get("resource").and_then(Value::as_str) {
            if issued_for.trim_end_matches('/') != resource.trim_end_matches('/') {
                warn!("identity endpoint issued a token for '{}' when '{}' was requested", issued_for, resource);
            }
        }

        token_from_payload(self.strategy(), resource, &payload)
    }
}
