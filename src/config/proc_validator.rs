//! Configuration validation with aggregated errors.
//! Every problem is collected before failing so one run reports them all.

use tracing::{error, info};
use url::Url;

use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::config::types::{AuthorizationConfig, CacheConfig, HandlerConfig, ServiceConfig};
use crate::error::{PropertyError, Result};
use crate::utils::constants::MANAGED_IDENTITY_ID;

/// Returns Ok(()) or a `Validation` error listing every issue.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.name.trim().is_empty() {
        errors.push("config: 'name' must not be empty".to_string());
    }

    validate_settings(&cfg.settings, &mut errors);

    for (id, authorization) in &cfg.authorizations {
        validate_authorization(id, authorization, &mut errors);
    }

    validate_handler(cfg, &mut errors);

    if let Some(cache) = &cfg.properties.cache {
        validate_cache(cache, &mut errors);
    }

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        Err(PropertyError::validation(format!(
            "config is not valid, total errors: {}\n{}",
            errors.len(),
            errors.join("\n")
        )))
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(retry) = &settings.retry {
        validate_retry("settings.retry", retry, errors);
    }

    if let Some(s) = settings.safety_margin_seconds {
        if s > 60 * 60 * 24 * 365 {
            errors.push(format!("settings.safety_margin_seconds ({}) is unreasonably large", s));
        }
    }

    if settings.request_timeout_ms == Some(0) {
        errors.push("settings.request_timeout_ms must be greater than 0".to_string());
    }

    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_retry(path: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if retry.attempts == Some(0) {
        errors.push(format!("{}.attempts must be at least 1", path));
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "{}.max_delay_ms ({}) must be >= base_delay_ms ({})",
                path, max, base
            ));
        }
    }
}

fn validate_authorization(id: &str, authorization: &AuthorizationConfig, errors: &mut Vec<String>) {
    if id.trim().is_empty() {
        errors.push("authorizations: ids must not be empty".to_string());
    }
    match authorization {
        AuthorizationConfig::ManagedIdentity { endpoint, .. } => {
            if let Some(endpoint) = endpoint {
                validate_url(&format!("authorizations['{}'].endpoint", id), endpoint, errors);
            }
        }
        AuthorizationConfig::AppRegistration { tenant, client_id, client_secret, authority, .. } => {
            for (field, value) in [("tenant", tenant), ("client_id", client_id), ("client_secret", client_secret)] {
                if value.trim().is_empty() {
                    errors.push(format!("authorizations['{}'].{} must not be empty", id, field));
                }
            }
            if let Some(authority) = authority {
                validate_url(&format!("authorizations['{}'].authority", id), authority, errors);
            }
        }
    }
}

fn validate_handler(cfg: &ServiceConfig, errors: &mut Vec<String>) {
    let handler = &cfg.properties.handler;
    if let HandlerConfig::AppConfig { store, label, endpoint, .. } = handler {
        if store.trim().is_empty() {
            errors.push("properties.handler.store must not be empty".to_string());
        }
        if label.trim().is_empty() {
            errors.push("properties.handler.label must not be empty".to_string());
        }
        if let Some(endpoint) = endpoint {
            validate_url("properties.handler.endpoint", endpoint, errors);
        }
    }

    // the managed identity default is registered at initialize when the host offers one
    for reference in handler.authorization_refs() {
        if reference != MANAGED_IDENTITY_ID && !cfg.authorizations.contains_key(reference) {
            errors.push(format!(
                "properties.handler references unknown authorization '{}'",
                reference
            ));
        }
    }
}

fn validate_cache(cache: &CacheConfig, errors: &mut Vec<String>) {
    if cache.ttl_seconds == Some(0) {
        errors.push("properties.cache.ttl_seconds must be greater than 0".to_string());
    }
    let mut zero: Vec<&String> = cache.overrides.iter().filter(|(_, ttl)| **ttl == 0).map(|(k, _)| k).collect();
    zero.sort();
    for key in zero {
        errors.push(format!("properties.cache.overrides['{}'] must be greater than 0", key));
    }
}

fn validate_url(path: &str, value: &str, errors: &mut Vec<String>) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(format!("{} '{}' has unsupported scheme '{}'", path, value, url.scheme())),
        Err(e) => errors.push(format!("{} '{}' is not a valid url: {}", path, value, e)),
    }
}
