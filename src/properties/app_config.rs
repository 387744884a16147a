use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::auth::authorization::ResourceAuthorization;
use crate::configuration::environment::Environment;
use crate::configuration::lifecycle::Lifecycle;
use crate::error::{from_status, from_transport, Backend, PropertyError, Result};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::properties::handler::PropertyHandler;
use crate::properties::vault::Vault;
use crate::resilience::retry::RetrySettings;
use crate::utils::constants::{
    APP_CONFIG_API_VERSION, APP_CONFIG_DOMAIN, CONTENT_TYPE_FEATURE_FLAG, CONTENT_TYPE_VAULT_REFERENCE,
    MANAGED_IDENTITY_ID,
};

static BACKEND: &str = "app_config";

/// Key-value item as returned by the configuration store.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigurationItem {
    pub key: String,
    pub label: Option<String>,
    pub content_type: Option<String>,
    pub value: Option<String>,
    pub etag: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub locked: bool,
    pub last_modified: Option<String>,
}

/// Payload shape, decided by `content_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    KeyValue,
    FeatureFlag,
    VaultReference,
}

impl ConfigurationItem {
    pub fn kind(&self) -> ItemKind {
        let content_type = self
            .content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .unwrap_or_default();
        match content_type.as_str() {
            CONTENT_TYPE_VAULT_REFERENCE => ItemKind::VaultReference,
            CONTENT_TYPE_FEATURE_FLAG => ItemKind::FeatureFlag,
            _ => ItemKind::KeyValue,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VaultReference {
    uri: String,
}

/// Fixed transport settings of a configuration store handler.
#[derive(Debug, Clone)]
pub struct AppConfigSettings {
    pub store: String,
    pub label: String,
    /// defaults to `https://<store>.azconfig.io`
    pub endpoint: Option<String>,
    pub authorization_id: String,
    /// defaults to `authorization_id`
    pub vault_authorization_id: Option<String>,
    pub api_version: String,
}

impl AppConfigSettings {
    pub fn new(store: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            label: label.into(),
            endpoint: None,
            authorization_id: MANAGED_IDENTITY_ID.to_owned(),
            vault_authorization_id: None,
            api_version: APP_CONFIG_API_VERSION.to_owned(),
        }
    }
}

/// Resolved at `initialize`.
#[derive(Debug)]
struct Wiring {
    client: reqwest::Client,
    authorization: Arc<ResourceAuthorization>,
    vault: Vault,
    retry: RetrySettings,
}

/// Remote key-value configuration store scoped by store and label.
///
/// Vault-reference items are dereferenced before returning, so callers
/// only ever see the secret value.
#[derive(Debug)]
pub struct AppConfigPropertyHandler {
    settings: AppConfigSettings,
    endpoint: Url,
    lifecycle: Lifecycle,
    wiring: OnceCell<Wiring>,
}

impl AppConfigPropertyHandler {
    pub const NAME: &'static str = "AppConfigPropertyHandler";

    pub fn new(settings: AppConfigSettings) -> Result<Self> {
        if settings.store.trim().is_empty() {
            return Err(PropertyError::validation("configuration store name is required"));
        }
        if settings.label.trim().is_empty() {
            return Err(PropertyError::validation(format!(
                "configuration store '{}' requires a label",
                settings.store
            )));
        }
        let raw_endpoint = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.{}", settings.store, APP_CONFIG_DOMAIN));
        let endpoint = Url::parse(&raw_endpoint).map_err(|e| {
            PropertyError::validation(format!("invalid store endpoint '{}': {}", raw_endpoint, e))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(PropertyError::validation(format!("store endpoint '{}' cannot be a base url", raw_endpoint)));
        }
        Ok(Self { settings, endpoint, lifecycle: Lifecycle::new(Self::NAME), wiring: OnceCell::new() })
    }

    pub fn settings(&self) -> &AppConfigSettings {
        &self.settings
    }

    /// Token audience of the store: its base URI.
    pub fn resource(&self) -> String {
        self.endpoint.as_str().trim_end_matches('/').to_owned()
    }

    /// `<endpoint>/kv/<key>?label=<label>&api-version=<v>` with the key
    /// percent-encoded as a single path segment.
    pub fn item_url(&self, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("kv").push(key);
        }
        url.query_pairs_mut()
            .append_pair("label", &self.settings.label)
            .append_pair("api-version", &self.settings.api_version);
        url
    }

    fn wiring(&self) -> Result<&Wiring> {
        self.wiring
            .get()
            .ok_or_else(|| PropertyError::lifecycle(format!("{} is not initialized", Self::NAME)))
    }

    /// Fetch the raw item for `key`; `Ok(None)` when the store has no such key.
    pub async fn get_item(&self, key: &str) -> Result<Option<ConfigurationItem>> {
        let wiring = self.wiring()?;
        let resource = self.resource();
        let url = self.item_url(key);
        // acquisition retries on its own
        let token = wiring.authorization.get_token(&resource).await?;

        wiring
            .retry
            .run_with_retry(|| {
                let url = url.clone();
                let resource = resource.as_str();
                let bearer = token.bearer();
                async move {
                    let response = wiring
                        .client
                        .get(url)
                        .header(reqwest::header::AUTHORIZATION, bearer)
                        .send()
                        .await
                        .map_err(|e| from_transport(e, BACKEND, Backend::Remote))?;

                    match response.status() {
                        http::StatusCode::NOT_FOUND => Ok(None),
                        http::StatusCode::UNAUTHORIZED | http::StatusCode::FORBIDDEN => {
                            // token may have been revoked; next call acquires a new one
                            wiring.authorization.invalidate(resource).await;
                            Err(PropertyError::authorization(format!(
                                "configuration store rejected credentials for '{}': {}",
                                key,
                                response.status()
                            )))
                        }
                        http::StatusCode::BAD_REQUEST => {
                            let detail = response.text().await.unwrap_or_default();
                            Err(PropertyError::label(
                                key,
                                format!("store rejected label '{}': {}", self.settings.label, detail),
                            ))
                        }
                        status if status.is_success() => {
                            response.json::<ConfigurationItem>().await.map(Some).map_err(|e| {
                                PropertyError::remote(format!("malformed configuration item '{}': {}", key, e))
                            })
                        }
                        status => Err(from_status(status, BACKEND, Backend::Remote)),
                    }
                }
            })
            .await
    }

    async fn resolve(&self, key: &str) -> Result<Option<String>> {
        let Some(item) = self.get_item(key).await? else {
            debug!("key '{}' not found in store '{}'", key, self.settings.store);
            return Ok(None);
        };

        if let Some(label) = item.label.as_deref() {
            if label != self.settings.label {
                return Err(PropertyError::label(
                    key,
                    format!("expected label '{}', store answered '{}'", self.settings.label, label),
                ));
            }
        }

        match item.kind() {
            ItemKind::KeyValue | ItemKind::FeatureFlag => Ok(item.value),
            ItemKind::VaultReference => {
                let raw = item.value.ok_or_else(|| {
                    PropertyError::remote(format!("vault reference '{}' has no value", key))
                })?;
                let reference: VaultReference = serde_json::from_str(&raw).map_err(|e| {
                    PropertyError::remote(format!("malformed vault reference '{}': {}", key, e))
                })?;
                debug!("dereferencing vault reference for '{}'", key);
                self.wiring()?.vault.get_secret(&reference.uri).await.map(Some)
            }
        }
    }
}

#[async_trait]
impl PropertyHandler for AppConfigPropertyHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn initialize(&self, env: &Environment) -> Result<()> {
        self.lifecycle.begin_initialize()?;
        let wired: Result<()> = async {
            let authorization = env.authorizations.get(&self.settings.authorization_id).await?;
            let vault_authorization = match &self.settings.vault_authorization_id {
                Some(id) => env.authorizations.get(id).await?,
                None => authorization.clone(),
            };
            let vault = Vault::new(env.client.clone(), vault_authorization).with_retry(env.retry.clone());
            self.wiring
                .set(Wiring { client: env.client.clone(), authorization, vault, retry: env.retry.clone() })
                .map_err(|_| PropertyError::lifecycle(format!("{} initialized twice", Self::NAME)))
        }
        .await;

        match wired {
            Ok(()) => {
                info!(store = %self.settings.store, label = %self.settings.label, "configuration store handler initialized");
                self.lifecycle.end_initialize()
            }
            Err(e) => {
                self.lifecycle.fail();
                Err(e)
            }
        }
    }

    /// Acquire the store token up front so bad credentials fail startup.
    async fn ready(&self, _env: &Environment) -> Result<()> {
        self.lifecycle.begin_ready()?;
        let wiring = self.wiring()?;
        match wiring.authorization.get_token(&self.resource()).await {
            Ok(_) => self.lifecycle.end_ready(),
            Err(e) => {
                self.lifecycle.fail();
                error!(store = %self.settings.store, error = %e, "configuration store token warm-up failed");
                Err(e)
            }
        }
    }

    async fn get_raw_property(&self, key: &str) -> Result<Option<String>> {
        self.lifecycle.ensure_ready("get_raw_property")?;
        let metrics = get_metrics().await;
        let start = get_instant();
        let res = self.resolve(key).await;
        metrics
            .remote_fetch_duration
            .with_label_values(&[BACKEND])
            .observe(start.elapsed().as_secs_f64());
        if let Err(e) = &res {
            let reason = match e {
                PropertyError::Label { .. } => "label",
                PropertyError::Authorization { .. } => "auth",
                e if e.is_transient() => "transient",
                _ => "error",
            };
            metrics.remote_fetch_failures.with_label_values(&[BACKEND, reason]).inc();
            warn!(key = %key, error = %e, "configuration store resolution failed");
        }
        res
    }
}

/// Read the `enabled` flag of a feature-flag payload.
pub fn feature_enabled(payload: &Value) -> bool {
    payload.get("enabled").and_then(Value::as_bool).unwrap_or(false)
}
