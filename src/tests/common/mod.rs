// tests/common/mod.rs
pub use axum::{Router, body::Body};
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use async_trait::async_trait;
use httpmock::prelude::*;
use reqwest::Client;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::auth::authorization::ResourceAuthorization;
use crate::auth::managed_identity::ManagedIdentitySource;
use crate::auth::source::TokenSource;
use crate::auth::token::Token;
use crate::configuration::environment::Environment;
use crate::error::{PropertyError, Result};
use crate::helpers::time::now_i64;
use crate::properties::handler::PropertyHandler;
use crate::resilience::retry::RetrySettings;

pub const IDENTITY_PATH: &str = "/msi/token";
pub const IDENTITY_SECRET: &str = "mock-identity-header";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Fast retries so failure tests stay quick.
pub fn quick_retry() -> RetrySettings {
    RetrySettings { attempts: 3, base_delay_ms: 1, max_delay_ms: 5 }
}

pub fn test_env() -> Environment {
    Environment::new(build_reqwest_client()).with_retry(quick_retry())
}

/// Run `initialize` and `ready` on a handler with a fresh environment.
pub async fn ready_env<H: PropertyHandler + ?Sized>(handler: &H) -> Environment {
    let env = test_env();
    handler.initialize(&env).await.expect("initialize");
    handler.ready(&env).await.expect("ready");
    env
}

/// Managed identity pointed at `server`, registered under `id`.
pub async fn register_identity(env: &Environment, server: &MockServer, id: &str) -> Arc<ResourceAuthorization> {
    let source = ManagedIdentitySource::new(server.url(IDENTITY_PATH), IDENTITY_SECRET);
    let authorization = ResourceAuthorization::new(id, Arc::new(source), env.client.clone())
        .with_safety_margin(env.safety_margin_seconds)
        .with_retry(env.retry.clone());
    env.authorizations.add(authorization).await
}

/// Identity endpoint answering every resource with `token`, valid for
/// `lifetime_secs`.
pub async fn mock_identity<'a>(server: &'a MockServer, token: &str, lifetime_secs: i64) -> httpmock::Mock<'a> {
    let expires_on = now_i64() + lifetime_secs;
    let token = token.to_owned();
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path(IDENTITY_PATH)
                .query_param("api-version", "2019-08-01")
                .header("X-IDENTITY-HEADER", IDENTITY_SECRET);
            then.status(200).json_body(json!({
                "access_token": token,
                "expires_on": expires_on.to_string(),
                "token_type": "Bearer"
            }));
        })
        .await
}

/// In-memory handler counting lookups per key.
#[derive(Debug, Default)]
pub struct MockPropertyHandler {
    properties: HashMap<String, String>,
    failing_keys: Vec<String>,
    fail_initialize: bool,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockPropertyHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Lookups of `key` fail with a transient remote error.
    pub fn failing_key(mut self, key: &str) -> Self {
        self.failing_keys.push(key.to_owned());
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn calls_for(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl PropertyHandler for MockPropertyHandler {
    fn name(&self) -> &str {
        "MockPropertyHandler"
    }

    async fn initialize(&self, _env: &Environment) -> Result<()> {
        if self.fail_initialize {
            return Err(PropertyError::validation("mock initialize failure"));
        }
        Ok(())
    }

    async fn ready(&self, _env: &Environment) -> Result<()> {
        Ok(())
    }

    async fn get_raw_property(&self, key: &str) -> Result<Option<String>> {
        *self.calls.lock().unwrap().entry(key.to_owned()).or_default() += 1;
        if self.failing_keys.iter().any(|k| k == key) {
            return Err(PropertyError::RemoteResolution {
                message: format!("mock failure for '{}'", key),
                transient: true,
            });
        }
        Ok(self.properties.get(key).cloned())
    }
}

/// Token source minting `token-<n>` with a fixed lifetime.
#[derive(Debug)]
pub struct CountingTokenSource {
    lifetime_secs: i64,
    acquisitions: AtomicUsize,
}

impl CountingTokenSource {
    pub fn new(lifetime_secs: i64) -> Self {
        Self { lifetime_secs, acquisitions: AtomicUsize::new(0) }
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for CountingTokenSource {
    fn strategy(&self) -> &'static str {
        "counting"
    }

    async fn acquire(&self, _client: &Client, resource: &str) -> Result<Token> {
        let n = self.acquisitions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Token::new(format!("token-{}", n), resource.to_owned(), now_i64() + self.lifetime_secs))
    }
}
