use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::auth::authorization::ResourceAuthorization;
use crate::auth::managed_identity::ManagedIdentitySource;
use crate::coercion::typed_value::{coerce, coerce_deserialize, coerce_with, PropertyType};
use crate::configuration::environment::Environment;
use crate::configuration::lifecycle::{Lifecycle, LifecycleState};
use crate::error::{PropertyError, Result};
use crate::observability::metrics::get_metrics;
use crate::properties::app_config::feature_enabled;
use crate::properties::env_handler::EnvPropertyHandler;
use crate::properties::handler::PropertyHandler;
use crate::utils::constants::MANAGED_IDENTITY_ID;

/// Gateway between consumers and the active property handler.
///
/// Built once at startup, then `initialize` and `ready` are called in
/// order; typed reads are legal only once READY.
#[derive(Debug)]
pub struct Configuration {
    name: String,
    lifecycle: Lifecycle,
    handler: Option<Arc<dyn PropertyHandler>>,
    active: OnceCell<Arc<dyn PropertyHandler>>,
    items: HashMap<String, Value>,
}

impl Configuration {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            lifecycle: Lifecycle::new(format!("Configuration '{}'", name)),
            name,
            handler: None,
            active: OnceCell::new(),
            items: HashMap::new(),
        }
    }

    /// Use `handler` instead of the default environment handler.
    pub fn with_handler(mut self, handler: Arc<dyn PropertyHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_item(mut self, key: impl Into<String>, value: Value) -> Self {
        self.items.insert(key.into(), value);
        self
    }

    pub fn set_item(&mut self, key: impl Into<String>, value: Value) {
        self.items.insert(key.into(), value);
    }

    pub fn get_item(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Select and initialize the active handler.
    pub async fn initialize(&self, env: &Environment) -> Result<()> {
        self.lifecycle.begin_initialize()?;
        info!(configuration = %self.name, "initializing configuration");

        let res: Result<()> = async {
            register_default_authorization(env).await?;
            let handler: Arc<dyn PropertyHandler> = match &self.handler {
                Some(handler) => handler.clone(),
                None => Arc::new(EnvPropertyHandler::new()),
            };
            handler.initialize(env).await?;
            info!(configuration = %self.name, handler = %handler.name(), "property handler initialized");
            self.active
                .set(handler)
                .map_err(|_| PropertyError::lifecycle("active handler already set"))
        }
        .await;

        self.settle(res, "initialize")?;
        self.lifecycle.end_initialize()
    }

    /// Ready the handler chain; READY afterwards.
    pub async fn ready(&self, env: &Environment) -> Result<()> {
        self.lifecycle.begin_ready()?;
        let handler = self
            .active
            .get()
            .ok_or_else(|| PropertyError::lifecycle("no active handler"))?;

        let res = handler.ready(env).await;
        self.settle(res, "ready")?;
        self.lifecycle.end_ready()?;

        get_metrics().await.configuration_ready.set(1);
        info!(configuration = %self.name, "configuration ready");
        Ok(())
    }

    /// `initialize` followed by `ready`.
    pub async fn start(&self, env: &Environment) -> Result<()> {
        self.initialize(env).await?;
        self.ready(env).await
    }

    fn settle(&self, res: Result<()>, phase: &str) -> Result<()> {
        res.map_err(|e| {
            self.lifecycle.fail();
            error!(configuration = %self.name, phase = %phase, error = %e, "configuration startup failed");
            e
        })
    }

    /// The active handler, once READY.
    pub fn handler(&self) -> Result<&Arc<dyn PropertyHandler>> {
        self.lifecycle.ensure_ready("property read")?;
        self.active
            .get()
            .ok_or_else(|| PropertyError::lifecycle("no active handler"))
    }

    pub async fn get_raw_property(&self, key: &str) -> Result<Option<String>> {
        self.handler()?.get_raw_property(key).await
    }

    /// Resolve `key` as any `PropertyType`.
    pub async fn get<T: PropertyType>(&self, key: &str, default: Option<T>) -> Result<Option<T>> {
        let raw = self.get_raw_property(key).await?;
        coerce(key, raw.as_deref(), default)
    }

    pub async fn get_property(&self, key: &str, default: Option<&str>) -> Result<Option<String>> {
        self.get::<String>(key, default.map(str::to_owned)).await
    }

    pub async fn get_number(&self, key: &str, default: Option<f64>) -> Result<Option<f64>> {
        self.get::<f64>(key, default).await
    }

    pub async fn get_boolean(&self, key: &str, default: Option<bool>) -> Result<Option<bool>> {
        self.get::<bool>(key, default).await
    }

    pub async fn get_regex(&self, key: &str, default: Option<Regex>) -> Result<Option<Regex>> {
        self.get::<Regex>(key, default).await
    }

    pub async fn get_object(&self, key: &str, default: Option<Value>) -> Result<Option<Value>> {
        self.get::<Value>(key, default).await
    }

    /// Parse JSON straight into `T`.
    pub async fn get_object_as<T: DeserializeOwned>(&self, key: &str, default: Option<T>) -> Result<Option<T>> {
        let raw = self.get_raw_property(key).await?;
        coerce_deserialize(key, raw.as_deref(), default)
    }

    /// Parse JSON and turn the structure into `T` with `decoder`.
    pub async fn get_object_with<T, F>(&self, key: &str, default: Option<T>, decoder: F) -> Result<Option<T>>
    where
        F: FnOnce(Value) -> Result<T>,
    {
        let raw = self.get_raw_property(key).await?;
        coerce_with(key, raw.as_deref(), default, decoder)
    }

    /// Whether the feature flag stored under `key` is enabled; an absent
    /// flag is disabled.
    pub async fn is_feature_enabled(&self, key: &str) -> Result<bool> {
        Ok(self
            .get_object(key, None)
            .await?
            .map(|flag| feature_enabled(&flag))
            .unwrap_or(false))
    }
}

/// Register a managed-identity authorization when the host provides one
/// and nothing else claimed the id.
async fn register_default_authorization(env: &Environment) -> Result<()> {
    if env.authorizations.contains(MANAGED_IDENTITY_ID).await || !ManagedIdentitySource::is_available() {
        return Ok(());
    }
    let source = ManagedIdentitySource::from_env()?;
    let authorization = ResourceAuthorization::new(MANAGED_IDENTITY_ID, Arc::new(source), env.client.clone())
        .with_safety_margin(env.safety_margin_seconds)
        .with_retry(env.retry.clone());
    env.authorizations.add(authorization).await;
    Ok(())
}
