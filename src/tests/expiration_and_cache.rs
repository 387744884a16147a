#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{extract::Path, routing::get, Json};
    use httpmock::prelude::*;

    use crate::auth::authorization::ResourceAuthorization;
    use crate::auth::token::Token;
    use crate::auth::token_cache::TokenCache;
    use crate::error::PropertyError;
    use crate::helpers::time::now_i64;
    use crate::properties::app_config::{AppConfigPropertyHandler, AppConfigSettings};
    use crate::properties::cache_handler::CachePropertyHandler;
    use crate::properties::handler::PropertyHandler;
    use crate::tests::common::*;

    #[tokio::test]
    async fn token_expiration_and_safety_margin_behavior() {
        let cache = TokenCache::new();
        let now = now_i64();
        cache.set(Token::new("short-val".into(), "https://r".into(), now + 30)).await;

        // 30s left is enough without a margin, not with the default 60s one
        assert_eq!(cache.get("https://r", 0).await.unwrap().access_token, "short-val");
        assert!(cache.get("https://r", 60).await.is_none());

        // an already expired token is never handed out
        cache.set(Token::new("old".into(), "https://r".into(), now - 1)).await;
        assert!(cache.get("https://r", 0).await.is_none());
    }

    #[tokio::test]
    async fn tokens_inside_the_margin_are_reacquired() {
        let short = Arc::new(CountingTokenSource::new(30));
        let authorization = ResourceAuthorization::new("short", short.clone(), build_reqwest_client())
            .with_safety_margin(60);
        let first = authorization.get_token("https://r").await.unwrap();
        let second = authorization.get_token("https://r").await.unwrap();
        assert_ne!(first.access_token, second.access_token);
        assert_eq!(short.acquisitions(), 2);

        let long = Arc::new(CountingTokenSource::new(3600));
        let authorization = ResourceAuthorization::new("long", long.clone(), build_reqwest_client())
            .with_safety_margin(60);
        authorization.get_token("https://r").await.unwrap();
        authorization.get_token("https://r").await.unwrap();
        assert_eq!(long.acquisitions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cached_properties_expire_after_ttl() {
        let mock = Arc::new(MockPropertyHandler::new().with_property("FOO", "bar"));
        let handler = CachePropertyHandler::with_ttl(mock.clone(), Duration::from_secs(10));
        ready_env(&handler).await;

        for _ in 0..3 {
            assert_eq!(handler.get_raw_property("FOO").await.unwrap().as_deref(), Some("bar"));
        }
        assert_eq!(mock.calls_for("FOO"), 1);

        tokio::time::advance(Duration::from_secs(9)).await;
        handler.get_raw_property("FOO").await.unwrap();
        assert_eq!(mock.calls_for("FOO"), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        handler.get_raw_property("FOO").await.unwrap();
        assert_eq!(mock.calls_for("FOO"), 2);
    }

    #[tokio::test]
    async fn absence_is_cached_and_failures_are_not() {
        let mock = Arc::new(MockPropertyHandler::new().failing_key("BROKEN"));
        let handler = CachePropertyHandler::new(mock.clone());
        ready_env(&handler).await;

        assert_eq!(handler.get_raw_property("MISSING").await.unwrap(), None);
        assert_eq!(handler.get_raw_property("MISSING").await.unwrap(), None);
        assert_eq!(mock.calls_for("MISSING"), 1);

        for _ in 0..2 {
            let err = handler.get_raw_property("BROKEN").await.unwrap_err();
            assert!(matches!(err, PropertyError::RemoteResolution { .. }));
        }
        assert_eq!(mock.calls_for("BROKEN"), 2);
        assert_eq!(handler.cached_len().await, 1);
    }

    #[tokio::test]
    async fn cached_store_is_hit_once_per_key() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/kv/{key}",
            get(move |Path(key): Path<String>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({
                        "key": key,
                        "label": "development",
                        "content_type": "",
                        "value": "cached-value",
                        "tags": {},
                        "locked": false
                    }))
                }
            }),
        );
        let (_server, addr) = spawn_axum(router).await;

        let identity = MockServer::start_async().await;
        mock_identity(&identity, "store-token", 3600).await;

        let env = test_env();
        register_identity(&env, &identity, "managed-identity").await;

        let mut settings = AppConfigSettings::new("mock-app-config", "development");
        settings.endpoint = Some(format!("http://{}", addr));
        let store = Arc::new(AppConfigPropertyHandler::new(settings).unwrap());
        let handler = CachePropertyHandler::new(store);
        handler.initialize(&env).await.unwrap();
        handler.ready(&env).await.unwrap();

        for _ in 0..5 {
            assert_eq!(handler.get_raw_property("mock_key").await.unwrap().as_deref(), Some("cached-value"));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        handler.clear().await;
        handler.get_raw_property("mock_key").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
