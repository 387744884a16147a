use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::auth::authorization::ResourceAuthorization;
use crate::error::{PropertyError, Result};

/// Named registry of authorization strategies shared by every handler of a
/// configuration.
#[derive(Debug, Clone, Default)]
pub struct ResourceAuthorizationContext {
    inner: Arc<RwLock<HashMap<String, Arc<ResourceAuthorization>>>>,
}

impl ResourceAuthorizationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authorization under its id, replacing any previous one.
    pub async fn add(&self, authorization: ResourceAuthorization) -> Arc<ResourceAuthorization> {
        let authorization = Arc::new(authorization);
        info!(
            "registering authorization '{}' ({})",
            authorization.id(),
            authorization.strategy()
        );
        self.inner
            .write()
            .await
            .insert(authorization.id().to_owned(), authorization.clone());
        authorization
    }

    pub async fn get(&self, id: &str) -> Result<Arc<ResourceAuthorization>> {
        self.inner
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| PropertyError::validation(format!("authorization '{}' is not registered", id)))
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.inner.read().await.contains_key(id)
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
