use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::auth::token::{jwt_expiration, Token};
use crate::error::{PropertyError, Result};
use crate::helpers::time::{parse_relative_expiry, parse_unix_expiry};

/// One way of obtaining a fresh bearer token for a resource audience.
///
/// Sources never cache; `ResourceAuthorization` owns the cache.
#[async_trait]
pub trait TokenSource: Send + Sync + std::fmt::Debug {
    /// Short strategy name used in logs and metrics.
    fn strategy(&self) -> &'static str;

    async fn acquire(&self, client: &Client, resource: &str) -> Result<Token>;
}

/// Build a token from an identity provider JSON payload.
///
/// Expiry is taken from `expires_on`, then `expires_in`, then the JWT
/// `exp` claim. A payload without any of them is rejected.
pub fn token_from_payload(strategy: &str, resource: &str, payload: &Value) -> Result<Token> {
    let access_token = payload
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            PropertyError::authorization(format!("{} response has no access_token", strategy))
        })?
        .to_owned();

    let expires = payload
        .get("expires_on")
        .and_then(parse_unix_expiry)
        .or_else(|| payload.get("expires_in").and_then(parse_relative_expiry))
        .or_else(|| jwt_expiration(&access_token))
        .ok_or_else(|| {
            PropertyError::authorization(format!(
                "{} response for '{}' carries no usable expiry",
                strategy, resource
            ))
        })?;

    Ok(Token::new(access_token, resource.to_owned(), expires))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::time::now_i64;
    use serde_json::json;

    #[test]
    fn payload_with_expires_on() {
        let token = token_from_payload("mi", "https://r", &json!({
            "access_token": "abc", "resource": "https://r", "expires_on": "1700000000"
        }))
        .unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.resource, "https://r");
        assert_eq!(token.expires, 1_700_000_000);
    }

    #[test]
    fn payload_with_expires_in() {
        let token = token_from_payload("app", "https://r", &json!({
            "access_token": "abc", "expires_in": 3600
        }))
        .unwrap();
        assert!(token.expires >= now_i64() + 3590);
    }

    #[test]
    fn malformed_payloads_are_authorization_errors() {
        let missing_token = token_from_payload("mi", "r", &json!({"expires_in": 10}));
        assert!(matches!(missing_token, Err(PropertyError::Authorization { .. })));

        let missing_expiry = token_from_payload("mi", "r", &json!({"access_token": "opaque"}));
        assert!(matches!(missing_expiry, Err(PropertyError::Authorization { .. })));

        let overflowing = token_from_payload("app", "r", &json!({"access_token": "a", "expires_in": i64::MAX}));
        assert!(matches!(overflowing, Err(PropertyError::Authorization { .. })));
    }
}
