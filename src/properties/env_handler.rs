use async_trait::async_trait;
use std::env::{self, VarError};
use tracing::debug;

use crate::configuration::environment::Environment;
use crate::configuration::lifecycle::Lifecycle;
use crate::error::{PropertyError, Result};
use crate::properties::handler::PropertyHandler;

/// Reads properties from the process environment table.
#[derive(Debug)]
pub struct EnvPropertyHandler {
    lifecycle: Lifecycle,
}

impl Default for EnvPropertyHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvPropertyHandler {
    pub const NAME: &'static str = "EnvPropertyHandler";

    pub fn new() -> Self {
        Self { lifecycle: Lifecycle::new(Self::NAME) }
    }
}

#[async_trait]
impl PropertyHandler for EnvPropertyHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn initialize(&self, _env: &Environment) -> Result<()> {
        self.lifecycle.begin_initialize()?;
        self.lifecycle.end_initialize()
    }

    async fn ready(&self, _env: &Environment) -> Result<()> {
        self.lifecycle.begin_ready()?;
        self.lifecycle.end_ready()
    }

    async fn get_raw_property(&self, key: &str) -> Result<Option<String>> {
        self.lifecycle.ensure_ready("get_raw_property")?;
        match env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => {
                debug!("environment variable '{}' is not set", key);
                Ok(None)
            }
            Err(VarError::NotUnicode(_)) => Err(PropertyError::type_coercion(
                key,
                "environment value is not valid unicode",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PropertyError;
    use reqwest::Client;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn reads_present_and_absent_variables() {
        let env = Environment::new(Client::new());
        let handler = EnvPropertyHandler::new();
        handler.initialize(&env).await.unwrap();
        handler.ready(&env).await.unwrap();

        std::env::set_var("PROPERTY_AGENT_ENV_HANDLER_ONE", "one");
        std::env::remove_var("PROPERTY_AGENT_ENV_HANDLER_MISSING");

        assert_eq!(
            handler.get_raw_property("PROPERTY_AGENT_ENV_HANDLER_ONE").await.unwrap(),
            Some("one".to_owned())
        );
        assert_eq!(handler.get_raw_property("PROPERTY_AGENT_ENV_HANDLER_MISSING").await.unwrap(), None);
        std::env::remove_var("PROPERTY_AGENT_ENV_HANDLER_ONE");
    }

    #[tokio::test]
    async fn reads_before_ready_are_rejected() {
        let env = Environment::new(Client::new());
        let handler = EnvPropertyHandler::new();
        assert!(matches!(handler.get_raw_property("PATH").await, Err(PropertyError::Lifecycle(_))));
        assert!(handler.ready(&env).await.is_err());
        handler.initialize(&env).await.unwrap();
        assert!(handler.get_raw_property("PATH").await.is_err());
    }
}
