use base64::Engine;
use serde::Deserialize;

use crate::helpers::time::now_i64;

/// A bearer token scoped to one resource audience.
///
/// Tokens are replaced wholesale on refresh and never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub resource: String,
    pub expires: i64, // UNIX TIMESTAMP
}

impl Token {
    pub fn new(access_token: String, resource: String, expires: i64) -> Self {
        Self { access_token, resource, expires }
    }

    /// A token is usable while `now < expires - margin`.
    pub fn is_valid(&self, safety_margin_seconds: u64) -> bool {
        let margin = i64::try_from(safety_margin_seconds).unwrap_or(i64::MAX);
        now_i64() < self.expires.saturating_sub(margin)
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: i64,
}

/// Read the `exp` claim from an access token when it is a JWT.
pub fn jwt_expiration(token: &str) -> Option<i64> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let payload = parts[1].trim_end_matches('=');
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;
    serde_json::from_slice::<JwtClaims>(&decoded).ok().map(|claims| claims.exp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn sample_jwt(exp: i64) -> String {
        // minimal unsigned JWT for tests: {"exp": exp}
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp));
        format!("{}.{}.", header, payload)
    }

    #[test]
    fn validity_honours_the_safety_margin() {
        let token = Token::new("t".into(), "r".into(), now_i64() + 30);
        assert!(token.is_valid(0));
        assert!(token.is_valid(10));
        assert!(!token.is_valid(30));
        assert!(!Token::new("t".into(), "r".into(), now_i64()).is_valid(0));
    }

    #[test]
    fn extreme_expiries_do_not_overflow() {
        assert!(!Token::new("t".into(), "r".into(), i64::MIN).is_valid(60));
        assert!(!Token::new("t".into(), "r".into(), now_i64() + 600).is_valid(u64::MAX));
        assert!(Token::new("t".into(), "r".into(), i64::MAX).is_valid(60));
    }

    #[test]
    fn jwt_exp_claim_is_extracted() {
        assert_eq!(jwt_expiration(&sample_jwt(1_700_000_000)), Some(1_700_000_000));
        assert_eq!(jwt_expiration("opaque-token"), None);
        assert_eq!(jwt_expiration("a.!!!.c"), None);
    }

    #[test]
    fn bearer_header_value() {
        let token = Token::new("abc".into(), "r".into(), 0);
        assert_eq!(token.bearer(), "Bearer abc");
    }
}
