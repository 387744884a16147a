#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::auth::authorization::ResourceAuthorization;
    use crate::properties::cache_handler::CachePropertyHandler;
    use crate::properties::handler::PropertyHandler;
    use crate::tests::common::*;

    const READERS: usize = 16;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_property_reads_agree() {
        let mock = Arc::new(MockPropertyHandler::new().with_property("SHARED", "shared-value"));
        let handler = Arc::new(CachePropertyHandler::new(mock.clone()));
        ready_env(handler.as_ref()).await;

        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let handler = handler.clone();
                tokio::spawn(async move { handler.get_raw_property("SHARED").await })
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.await.unwrap().unwrap().as_deref(), Some("shared-value"));
        }
        // racing misses may each reach the backend, but the cache ends with one entry
        assert!(mock.calls_for("SHARED") >= 1 && mock.calls_for("SHARED") <= READERS);
        assert_eq!(handler.cached_len().await, 1);
        assert_eq!(handler.get_raw_property("SHARED").await.unwrap().as_deref(), Some("shared-value"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_token_reads_see_whole_tokens() {
        let source = Arc::new(CountingTokenSource::new(3600));
        let authorization = Arc::new(ResourceAuthorization::new("shared", source.clone(), build_reqwest_client()));

        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let authorization = authorization.clone();
                tokio::spawn(async move { authorization.get_token("https://shared").await })
            })
            .collect();

        let mut seen: HashMap<String, i64> = HashMap::new();
        for reader in readers {
            let token = reader.await.unwrap().unwrap();
            assert_eq!(token.resource, "https://shared");
            // one access token never appears with two different expiries
            let expires = *seen.entry(token.access_token.clone()).or_insert(token.expires);
            assert_eq!(expires, token.expires);
        }
        assert!(source.acquisitions() >= 1 && source.acquisitions() <= READERS);

        let cached = authorization.get_token("https://shared").await.unwrap();
        assert_eq!(seen.get(&cached.access_token), Some(&cached.expires));
    }
}
