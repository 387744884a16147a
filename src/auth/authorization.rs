use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::auth::source::TokenSource;
use crate::auth::token::Token;
use crate::auth::token_cache::TokenCache;
use crate::error::Result;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;
use crate::utils::constants::DEFAULT_SAFETY_MARGIN_SECS;

/// Token lifecycle for one authentication strategy: acquire, cache per
/// resource audience, refresh before expiry.
#[derive(Debug, Clone)]
pub struct ResourceAuthorization {
    id: String,
    source: Arc<dyn TokenSource>,
    cache: TokenCache,
    client: Client,
    safety_margin_seconds: u64,
    retry: RetrySettings,
}

impl ResourceAuthorization {
    pub fn new(id: impl Into<String>, source: Arc<dyn TokenSource>, client: Client) -> Self {
        Self {
            id: id.into(),
            source,
            cache: TokenCache::new(),
            client,
            safety_margin_seconds: DEFAULT_SAFETY_MARGIN_SECS,
            retry: RetrySettings::default(),
        }
    }

    pub fn with_safety_margin(mut self, safety_margin_seconds: u64) -> Self {
        self.safety_margin_seconds = safety_margin_seconds;
        self
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn strategy(&self) -> &'static str {
        self.source.strategy()
    }

    /// Cached token for `resource`, acquiring a new one when missing or
    /// within the safety margin of its expiry.
    pub async fn get_token(&self, resource: &str) -> Result<Token> {
        if let Some(token) = self.cache.get(resource, self.safety_margin_seconds).await {
            debug!("token cache hit for '{}' ({})", resource, self.id);
            return Ok(token);
        }
        self.refresh_token(resource).await
    }

    /// Acquire a fresh token for `resource` regardless of the cache and
    /// replace the cached entry.
    pub async fn refresh_token(&self, resource: &str) -> Result<Token> {
        let metrics = get_metrics().await;
        let strategy = self.source.strategy();

        let acquired = self
            .retry
            .run_with_retry(|| self.source.acquire(&self.client, resource))
            .await;

        match acquired {
            Ok(token) => {
                metrics.token_acquisitions.with_label_values(&[strategy, resource]).inc();
                info!(
                    authorization = %self.id,
                    resource = %resource,
                    expires = token.expires,
                    "token acquired"
                );
                self.cache.set(token.clone()).await;
                Ok(token)
            }
            Err(e) => {
                metrics.token_acquisition_failures.with_label_values(&[strategy]).inc();
                error!(authorization = %self.id, resource = %resource, error = %e, "token acquisition failed");
                Err(e)
            }
        }
    }

    /// Drop the cached token for `resource`.
    pub async fn invalidate(&self, resource: &str) {
        self.cache.remove(resource).await;
    }
}
