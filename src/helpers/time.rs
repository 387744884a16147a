use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::time::Instant;

use crate::utils::constants::DEFAULT_SAFETY_MARGIN_SECS;

pub fn get_token_safety_margin_seconds(
    safety_margin_seconds_settings: Option<u64>,
    safety_margin_seconds_authorization: Option<u64>,
) -> u64 {
    // authorization level
    safety_margin_seconds_authorization
        // settings (global) level
        .or(safety_margin_seconds_settings)
        .unwrap_or(DEFAULT_SAFETY_MARGIN_SECS)
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// Read an absolute expiry (unix seconds) from a provider field.
///
/// Identity endpoints disagree on the shape: unix seconds as a number or a
/// numeric string, or an RFC 3339 timestamp.
pub fn parse_unix_expiry(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && f.abs() < i64::MAX as f64).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp()))
                .or_else(|| {
                    // `2021-10-29 19:38:43 +00:00` style
                    DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %:z").ok().map(|dt| dt.timestamp())
                })
        }
        _ => None,
    }
}

/// Read a relative lifetime (seconds from now) from a provider field.
pub fn parse_relative_expiry(value: &Value) -> Option<i64> {
    let seconds = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    now_i64().checked_add(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unix_expiry_accepts_numbers_strings_and_timestamps() {
        assert_eq!(parse_unix_expiry(&json!(1700000000)), Some(1700000000));
        assert_eq!(parse_unix_expiry(&json!("1700000000")), Some(1700000000));
        assert_eq!(parse_unix_expiry(&json!("2023-11-14T22:13:20Z")), Some(1700000000));
        assert_eq!(parse_unix_expiry(&json!("2023-11-14T23:13:20+01:00")), Some(1700000000));
        assert_eq!(parse_unix_expiry(&json!("soon")), None);
        assert_eq!(parse_unix_expiry(&json!(null)), None);
    }

    #[test]
    fn relative_expiry_is_anchored_on_now() {
        let before = now_i64();
        let exp = parse_relative_expiry(&json!("3599")).unwrap();
        assert!(exp >= before + 3599 && exp <= now_i64() + 3599);
        assert!(parse_relative_expiry(&json!({})).is_none());
    }

    #[test]
    fn out_of_range_expiry_is_rejected() {
        assert!(parse_relative_expiry(&json!(i64::MAX)).is_none());
        assert!(parse_relative_expiry(&json!(i64::MAX.to_string())).is_none());
        assert!(parse_unix_expiry(&json!(1e300)).is_none());
        assert!(parse_unix_expiry(&json!(f64::MIN)).is_none());
    }

    #[test]
    fn safety_margin_prefers_the_most_specific_level() {
        assert_eq!(get_token_safety_margin_seconds(Some(30), Some(5)), 5);
        assert_eq!(get_token_safety_margin_seconds(Some(30), None), 30);
        assert_eq!(get_token_safety_margin_seconds(None, None), DEFAULT_SAFETY_MARGIN_SECS);
    }
}
