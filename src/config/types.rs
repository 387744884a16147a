use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::settings::SettingsConfig;
use crate::utils::constants::MANAGED_IDENTITY_ID;

/// Root of the YAML service file.
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub authorizations: HashMap<String, AuthorizationConfig>,
    #[serde(default)]
    pub properties: PropertiesConfig,
    #[serde(default)]
    pub items: HashMap<String, Value>,
}

fn default_name() -> String {
    "property-agent".to_owned()
}

/// ================================
/// Authorizations
/// ================================
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthorizationConfig {
    /// falls back to IDENTITY_ENDPOINT / IDENTITY_HEADER when unset
    ManagedIdentity {
        endpoint: Option<String>,
        identity_header: Option<String>,
        safety_margin_seconds: Option<u64>,
    },
    AppRegistration {
        tenant: String,
        client_id: String,
        client_secret: String,
        authority: Option<String>,
        safety_margin_seconds: Option<u64>,
    },
}

impl AuthorizationConfig {
    pub fn safety_margin_seconds(&self) -> Option<u64> {
        match self {
            AuthorizationConfig::ManagedIdentity { safety_margin_seconds, .. }
            | AuthorizationConfig::AppRegistration { safety_margin_seconds, .. } => *safety_margin_seconds,
        }
    }
}

/// ================================
/// Properties
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PropertiesConfig {
    #[serde(default)]
    pub handler: HandlerConfig,
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandlerConfig {
    #[default]
    Env,
    EnvVault {
        authorization: Option<String>,
    },
    AppConfig {
        store: String,
        label: String,
        authorization: Option<String>,
        endpoint: Option<String>,
        vault_authorization: Option<String>,
    },
}

impl HandlerConfig {
    /// Authorization ids the handler will look up at initialize.
    pub fn authorization_refs(&self) -> Vec<&str> {
        match self {
            HandlerConfig::Env => vec![],
            HandlerConfig::EnvVault { authorization } => {
                vec![authorization.as_deref().unwrap_or(MANAGED_IDENTITY_ID)]
            }
            HandlerConfig::AppConfig { authorization, vault_authorization, .. } => {
                let store = authorization.as_deref().unwrap_or(MANAGED_IDENTITY_ID);
                let mut refs = vec![store];
                if let Some(vault) = vault_authorization.as_deref() {
                    refs.push(vault);
                }
                refs
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub ttl_seconds: Option<u64>,
    #[serde(default)]
    pub overrides: HashMap<String, u64>,
}
