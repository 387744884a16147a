use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};
use url::Url;

use crate::auth::authorization::ResourceAuthorization;
use crate::error::{from_status, from_transport, Backend, PropertyError, Result};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;
use crate::utils::constants::{VAULT_API_VERSION, VAULT_RESOURCE};

static BACKEND: &str = "vault";

/// Secret bundle returned by the vault.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretBundle {
    pub value: String,
    pub content_type: Option<String>,
    pub id: Option<String>,
}

/// Dereferences secret URIs with a token scoped to the vault audience.
///
/// Every failure, including a missing secret, is a `RemoteResolution`
/// error: a reference that cannot be followed is never "absent".
#[derive(Debug, Clone)]
pub struct Vault {
    client: Client,
    authorization: Arc<ResourceAuthorization>,
    resource: String,
    retry: RetrySettings,
}

impl Vault {
    pub fn new(client: Client, authorization: Arc<ResourceAuthorization>) -> Self {
        Self {
            client,
            authorization,
            resource: VAULT_RESOURCE.to_owned(),
            retry: RetrySettings::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Current value of the secret at `uri`.
    pub async fn get_secret(&self, uri: &str) -> Result<String> {
        let metrics = get_metrics().await;
        let start = get_instant();
        let res = self.fetch(uri).await;
        metrics
            .remote_fetch_duration
            .with_label_values(&[BACKEND])
            .observe(start.elapsed().as_secs_f64());

        res.map(|bundle| bundle.value).map_err(|e| {
            let reason = if e.is_transient() { "transient" } else { "error" };
            metrics.remote_fetch_failures.with_label_values(&[BACKEND, reason]).inc();
            error!(uri = %uri, error = %e, "secret resolution failed");
            e
        })
    }

    async fn fetch(&self, uri: &str) -> Result<SecretBundle> {
        let url = secret_url(uri)?;
        let token = self.authorization.get_token(&self.resource).await.map_err(as_remote)?;

        debug!("fetching secret '{}'", url.path());
        self.retry
            .run_with_retry(|| {
                let url = url.clone();
                let bearer = token.bearer();
                async move {
                    let response = self
                        .client
                        .get(url)
                        .header(reqwest::header::AUTHORIZATION, bearer)
                        .send()
                        .await
                        .map_err(|e| from_transport(e, BACKEND, Backend::Remote))?;

                    let status = response.status();
                    if status == http::StatusCode::NOT_FOUND {
                        return Err(PropertyError::remote(format!("secret '{}' does not exist", uri)));
                    }
                    if status == http::StatusCode::UNAUTHORIZED || status == http::StatusCode::FORBIDDEN {
                        self.authorization.invalidate(&self.resource).await;
                    }
                    if !status.is_success() {
                        return Err(from_status(status, BACKEND, Backend::Remote));
                    }
                    response.json::<SecretBundle>().await.map_err(|e| {
                        PropertyError::remote(format!("vault returned a malformed secret bundle: {}", e))
                    })
                }
            })
            .await
    }
}

/// Validate a secret URI and pin the API version.
pub fn secret_url(uri: &str) -> Result<Url> {
    let mut url = Url::parse(uri)
        .map_err(|e| PropertyError::remote(format!("invalid secret uri '{}': {}", uri, e)))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(PropertyError::remote(format!("secret uri '{}' must be http(s)", uri)));
    }
    if !url.query_pairs().any(|(k, _)| k == "api-version") {
        url.query_pairs_mut().append_pair("api-version", VAULT_API_VERSION);
    }
    Ok(url)
}

fn as_remote(err: PropertyError) -> PropertyError {
    match err {
        PropertyError::Authorization { message, transient } => PropertyError::RemoteResolution {
            message: format!("vault authorization: {}", message),
            transient,
        },
        other => other,
    }
}
