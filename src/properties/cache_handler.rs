use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::configuration::environment::Environment;
use crate::error::Result;
use crate::observability::metrics::get_metrics;
use crate::properties::handler::PropertyHandler;
use crate::utils::constants::DEFAULT_CACHE_TTL_SECS;

/// A resolved raw value; `None` records that the key is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedProperty {
    pub value: Option<String>,
    pub expires_at: Instant,
}

impl CachedProperty {
    pub fn new(value: Option<String>, ttl: Duration) -> Self {
        Self { value, expires_at: Instant::now() + ttl }
    }

    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Property key -> cached property. Expiry is checked lazily on read.
#[derive(Debug, Clone, Default)]
pub struct PropertyCache {
    inner: Arc<RwLock<HashMap<String, CachedProperty>>>,
}

impl PropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `key` unless missing or expired
    pub async fn get(&self, key: &str) -> Option<CachedProperty> {
        let map = self.inner.read().await;
        map.get(key).filter(|entry| entry.is_valid()).cloned()
    }

    /// Insert or replace the whole entry
    pub async fn set(&self, key: &str, entry: CachedProperty) {
        let mut map = self.inner.write().await;
        map.insert(key.to_owned(), entry);
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

/// Decorator caching whatever the wrapped handler resolves, absent keys
/// included, for a fixed TTL. Failures are never cached.
#[derive(Debug)]
pub struct CachePropertyHandler {
    name: String,
    inner: Arc<dyn PropertyHandler>,
    cache: PropertyCache,
    ttl: Duration,
    overrides: HashMap<String, Duration>,
}

impl CachePropertyHandler {
    pub fn new(inner: Arc<dyn PropertyHandler>) -> Self {
        Self::with_ttl(inner, Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }

    pub fn with_ttl(inner: Arc<dyn PropertyHandler>, ttl: Duration) -> Self {
        Self {
            name: format!("CachePropertyHandler({})", inner.name()),
            inner,
            cache: PropertyCache::new(),
            ttl,
            overrides: HashMap::new(),
        }
    }

    /// Cache `key` for `ttl` instead of the handler default.
    pub fn with_override(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.overrides.insert(key.into(), ttl);
        self
    }

    pub fn ttl_for(&self, key: &str) -> Duration {
        self.overrides.get(key).copied().unwrap_or(self.ttl)
    }

    pub fn inner(&self) -> &Arc<dyn PropertyHandler> {
        &self.inner
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.len().await
    }
}

#[async_trait]
impl PropertyHandler for CachePropertyHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self, env: &Environment) -> Result<()> {
        self.inner.initialize(env).await
    }

    async fn ready(&self, env: &Environment) -> Result<()> {
        self.inner.ready(env).await
    }

    async fn get_raw_property(&self, key: &str) -> Result<Option<String>> {
        let metrics = get_metrics().await;
        let label = self.inner.name();

        if let Some(entry) = self.cache.get(key).await {
            debug!("property cache hit for '{}'", key);
            metrics.property_cache_hits.with_label_values(&[label]).inc();
            return Ok(entry.value);
        }

        metrics.property_cache_misses.with_label_values(&[label]).inc();
        let value = self.inner.get_raw_property(key).await?;
        self.cache
            .set(key, CachedProperty::new(value.clone(), self.ttl_for(key)))
            .await;
        Ok(value)
    }
}
