use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::configuration::environment::Environment;
use crate::error::{PropertyError, Result};
use crate::properties::env_handler::EnvPropertyHandler;
use crate::properties::handler::PropertyHandler;
use crate::properties::vault::Vault;
use crate::utils::constants::{MANAGED_IDENTITY_ID, VAULT_SETTING_PREFIX};

/// Environment handler that follows `@Microsoft.KeyVault(SecretUri=...)`
/// references through the vault; plain values pass through.
#[derive(Debug)]
pub struct VaultEnvPropertyHandler {
    inner: EnvPropertyHandler,
    authorization_id: String,
    vault: OnceCell<Vault>,
}

impl Default for VaultEnvPropertyHandler {
    fn default() -> Self {
        Self::new(MANAGED_IDENTITY_ID)
    }
}

impl VaultEnvPropertyHandler {
    pub const NAME: &'static str = "VaultEnvPropertyHandler";

    pub fn new(authorization_id: impl Into<String>) -> Self {
        Self {
            inner: EnvPropertyHandler::new(),
            authorization_id: authorization_id.into(),
            vault: OnceCell::new(),
        }
    }
}

#[async_trait]
impl PropertyHandler for VaultEnvPropertyHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn initialize(&self, env: &Environment) -> Result<()> {
        self.inner.initialize(env).await?;
        let authorization = env.authorizations.get(&self.authorization_id).await?;
        let vault = Vault::new(env.client.clone(), authorization).with_retry(env.retry.clone());
        self.vault
            .set(vault)
            .map_err(|_| PropertyError::lifecycle(format!("{} initialized twice", Self::NAME)))
    }

    async fn ready(&self, env: &Environment) -> Result<()> {
        self.inner.ready(env).await
    }

    async fn get_raw_property(&self, key: &str) -> Result<Option<String>> {
        let Some(raw) = self.inner.get_raw_property(key).await? else {
            return Ok(None);
        };
        let Some(uri) = parse_vault_setting(&raw) else {
            return Ok(Some(raw));
        };
        debug!("property '{}' is a vault reference", key);
        let vault = self
            .vault
            .get()
            .ok_or_else(|| PropertyError::lifecycle(format!("{} is not initialized", Self::NAME)))?;
        vault.get_secret(&uri).await.map(Some)
    }
}

/// Extract the secret URI from `@Microsoft.KeyVault(SecretUri=<uri>)`.
pub fn parse_vault_setting(raw: &str) -> Option<String> {
    let body = raw.trim().strip_prefix(VAULT_SETTING_PREFIX)?.strip_suffix(')')?;
    body.split(';')
        .filter_map(|part| part.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("SecretUri"))
        .map(|(_, uri)| uri.trim().to_owned())
        .filter(|uri| !uri.is_empty())
}
