use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::auth::app_registration::AppRegistrationSource;
use crate::auth::authorization::ResourceAuthorization;
use crate::auth::managed_identity::ManagedIdentitySource;
use crate::auth::source::TokenSource;
use crate::config::types::{AuthorizationConfig, CacheConfig, HandlerConfig, ServiceConfig};
use crate::configuration::{Configuration, Environment};
use crate::error::Result;
use crate::helpers::time::get_token_safety_margin_seconds;
use crate::properties::app_config::{AppConfigPropertyHandler, AppConfigSettings};
use crate::properties::cache_handler::CachePropertyHandler;
use crate::properties::env_handler::EnvPropertyHandler;
use crate::properties::env_vault_handler::VaultEnvPropertyHandler;
use crate::properties::handler::PropertyHandler;
use crate::resilience::retry::RetrySettings;
use crate::utils::constants::{DEFAULT_CACHE_TTL_SECS, MANAGED_IDENTITY_ID};

/// Turn a validated service config into a configuration and the
/// environment it must be started with.
pub async fn build_configuration(cfg: &ServiceConfig, client: Client) -> Result<(Configuration, Environment)> {
    let retry = RetrySettings::from_config(cfg.settings.retry.as_ref());
    let safety_margin = get_token_safety_margin_seconds(cfg.settings.safety_margin_seconds, None);
    let env = Environment::new(client.clone())
        .with_retry(retry.clone())
        .with_safety_margin(safety_margin);

    let mut ids: Vec<&String> = cfg.authorizations.keys().collect();
    ids.sort();
    for id in ids {
        let auth_cfg = &cfg.authorizations[id];
        let margin = get_token_safety_margin_seconds(cfg.settings.safety_margin_seconds, auth_cfg.safety_margin_seconds());
        let authorization = ResourceAuthorization::new(id.as_str(), build_source(auth_cfg)?, client.clone())
            .with_safety_margin(margin)
            .with_retry(retry.clone());
        env.authorizations.add(authorization).await;
    }

    let handler = build_handler(&cfg.properties.handler)?;
    let handler = match &cfg.properties.cache {
        Some(cache) => wrap_in_cache(handler, cache),
        None => handler,
    };
    info!(configuration = %cfg.name, handler = %handler.name(), "configuration built");

    let mut configuration = Configuration::new(cfg.name.as_str()).with_handler(handler);
    for (key, value) in &cfg.items {
        configuration.set_item(key.as_str(), value.clone());
    }
    Ok((configuration, env))
}

/// Token source for one `authorizations` entry. A managed identity without
/// both endpoint and header reads them from the host environment.
pub fn build_source(cfg: &AuthorizationConfig) -> Result<Arc<dyn TokenSource>> {
    let source: Arc<dyn TokenSource> = match cfg {
        AuthorizationConfig::ManagedIdentity { endpoint: Some(endpoint), identity_header: Some(header), .. } => {
            Arc::new(ManagedIdentitySource::new(endpoint.as_str(), header.as_str()))
        }
        AuthorizationConfig::ManagedIdentity { .. } => Arc::new(ManagedIdentitySource::from_env()?),
        AuthorizationConfig::AppRegistration { tenant, client_id, client_secret, authority, .. } => {
            let source = AppRegistrationSource::new(tenant.as_str(), client_id.as_str(), client_secret.as_str());
            match authority {
                Some(authority) => Arc::new(source.with_authority(authority.as_str())),
                None => Arc::new(source),
            }
        }
    };
    Ok(source)
}

pub fn build_handler(cfg: &HandlerConfig) -> Result<Arc<dyn PropertyHandler>> {
    let handler: Arc<dyn PropertyHandler> = match cfg {
        HandlerConfig::Env => Arc::new(EnvPropertyHandler::new()),
        HandlerConfig::EnvVault { authorization } => Arc::new(VaultEnvPropertyHandler::new(
            authorization.as_deref().unwrap_or(MANAGED_IDENTITY_ID),
        )),
        HandlerConfig::AppConfig { store, label, authorization, endpoint, vault_authorization } => {
            let mut settings = AppConfigSettings::new(store.as_str(), label.as_str());
            settings.endpoint = endpoint.clone();
            settings.vault_authorization_id = vault_authorization.clone();
            if let Some(authorization) = authorization {
                settings.authorization_id = authorization.clone();
            }
            Arc::new(AppConfigPropertyHandler::new(settings)?)
        }
    };
    Ok(handler)
}

fn wrap_in_cache(handler: Arc<dyn PropertyHandler>, cache: &CacheConfig) -> Arc<dyn PropertyHandler> {
    let ttl = Duration::from_secs(cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS));
    let cached = cache
        .overrides
        .iter()
        .fold(CachePropertyHandler::with_ttl(handler, ttl), |cached, (key, secs)| {
            cached.with_override(key.as_str(), Duration::from_secs(*secs))
        });
    Arc::new(cached)
}
