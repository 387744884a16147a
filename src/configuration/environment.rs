use reqwest::Client;
use std::time::Duration;

use crate::auth::context::ResourceAuthorizationContext;
use crate::resilience::retry::RetrySettings;
use crate::utils::constants::{DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_SAFETY_MARGIN_SECS};

/// What handlers receive during `initialize` and `ready`: the shared HTTP
/// client, the authorization registry and runtime tunables.
#[derive(Debug, Clone)]
pub struct Environment {
    pub client: Client,
    pub authorizations: ResourceAuthorizationContext,
    pub retry: RetrySettings,
    pub safety_margin_seconds: u64,
}

impl Environment {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            authorizations: ResourceAuthorizationContext::new(),
            retry: RetrySettings::default(),
            safety_margin_seconds: DEFAULT_SAFETY_MARGIN_SECS,
        }
    }

    pub fn with_authorizations(mut self, authorizations: ResourceAuthorizationContext) -> Self {
        self.authorizations = authorizations;
        self
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_safety_margin(mut self, safety_margin_seconds: u64) -> Self {
        self.safety_margin_seconds = safety_margin_seconds;
        self
    }
}

/// Build the shared client with the transport timeout.
pub fn build_client(timeout_ms: Option<u64>) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS)))
        .build()
}
