use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::token::Token;

/// Resource-keyed token cache: resource audience -> token
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    inner: Arc<RwLock<HashMap<String, Token>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Replace the token for its resource
    pub async fn set(&self, token: Token) {
        let mut map = self.inner.write().await;
        map.insert(token.resource.clone(), token);
    }

    /// Get token if it exists and is still valid with the given margin
    pub async fn get(&self, resource: &str, safety_margin_seconds: u64) -> Option<Token> {
        let map = self.inner.read().await;
        map.get(resource)
            .filter(|token| token.is_valid(safety_margin_seconds))
            .cloned()
    }

    pub async fn remove(&self, resource: &str) -> Option<Token> {
        self.inner.write().await.remove(resource)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::time::now_i64;

    #[tokio::test]
    async fn tokens_are_isolated_per_resource() {
        let cache = TokenCache::new();
        assert!(cache.is_empty().await);
        cache.set(Token::new("one".into(), "https://a".into(), now_i64() + 600)).await;
        cache.set(Token::new("two".into(), "https://b".into(), now_i64() + 600)).await;

        assert_eq!(cache.get("https://a", 0).await.unwrap().access_token, "one");
        assert_eq!(cache.get("https://b", 0).await.unwrap().access_token, "two");
        assert!(cache.get("https://c", 0).await.is_none());
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn expired_tokens_are_never_returned() {
        let cache = TokenCache::new();
        cache.set(Token::new("old".into(), "https://a".into(), now_i64() + 20)).await;

        assert!(cache.get("https://a", 0).await.is_some());
        // inside the safety margin counts as expired
        assert!(cache.get("https://a", 30).await.is_none());
    }

    #[tokio::test]
    async fn set_replaces_the_entry_wholesale() {
        let cache = TokenCache::new();
        cache.set(Token::new("old".into(), "https://a".into(), now_i64() + 5)).await;
        cache.set(Token::new("new".into(), "https://a".into(), now_i64() + 600)).await;

        let token = cache.get("https://a", 0).await.unwrap();
        assert_eq!(token.access_token, "new");
        assert!(token.expires > now_i64() + 500);
        assert_eq!(cache.len().await, 1);
    }
}
