use async_trait::async_trait;

use crate::configuration::environment::Environment;
use crate::error::Result;

/// A backend able to resolve raw property values.
///
/// `initialize` then `ready` must both complete, in that order, before
/// `get_raw_property` is called. An absent key resolves to `Ok(None)`.
#[async_trait]
pub trait PropertyHandler: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    async fn initialize(&self, env: &Environment) -> Result<()>;

    async fn ready(&self, env: &Environment) -> Result<()>;

    async fn get_raw_property(&self, key: &str) -> Result<Option<String>>;
}
