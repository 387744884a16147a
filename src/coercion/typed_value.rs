use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{PropertyError, Result};

/// A type a raw property string can be coerced into.
///
/// Coercions are pure functions of the raw value.
pub trait PropertyType: Sized {
    const TYPE_NAME: &'static str;

    fn coerce(key: &str, raw: &str) -> Result<Self>;
}

impl PropertyType for String {
    const TYPE_NAME: &'static str = "string";

    fn coerce(_key: &str, raw: &str) -> Result<Self> {
        Ok(raw.to_owned())
    }
}

impl PropertyType for f64 {
    const TYPE_NAME: &'static str = "number";

    fn coerce(key: &str, raw: &str) -> Result<Self> {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| PropertyError::type_coercion(key, format!("'{}' is not a number", raw)))
    }
}

impl PropertyType for i64 {
    const TYPE_NAME: &'static str = "integer";

    fn coerce(key: &str, raw: &str) -> Result<Self> {
        raw.trim()
            .parse::<i64>()
            .map_err(|e| PropertyError::type_coercion(key, format!("'{}' is not an integer: {}", raw, e)))
    }
}

impl PropertyType for u64 {
    const TYPE_NAME: &'static str = "unsigned integer";

    fn coerce(key: &str, raw: &str) -> Result<Self> {
        raw.trim().parse::<u64>().map_err(|e| {
            PropertyError::type_coercion(key, format!("'{}' is not an unsigned integer: {}", raw, e))
        })
    }
}

impl PropertyType for bool {
    const TYPE_NAME: &'static str = "boolean";

    /// Only `true` (any case) is true; every other present value is false.
    fn coerce(_key: &str, raw: &str) -> Result<Self> {
        Ok(raw.trim().eq_ignore_ascii_case("true"))
    }
}

impl PropertyType for Regex {
    const TYPE_NAME: &'static str = "regex";

    fn coerce(key: &str, raw: &str) -> Result<Self> {
        Regex::new(raw)
            .map_err(|e| PropertyError::type_coercion(key, format!("invalid pattern: {}", e)))
    }
}

impl PropertyType for Value {
    const TYPE_NAME: &'static str = "json";

    fn coerce(key: &str, raw: &str) -> Result<Self> {
        parse_json(key, raw)
    }
}

/// Coerce a raw lookup; an absent value yields the default untouched.
pub fn coerce<T: PropertyType>(key: &str, raw: Option<&str>, default: Option<T>) -> Result<Option<T>> {
    match raw {
        Some(raw) => T::coerce(key, raw).map(Some),
        None => Ok(default),
    }
}

/// Parse JSON and hand the structure to `decoder`. The decoder is not
/// invoked for an absent value.
pub fn coerce_with<T, F>(key: &str, raw: Option<&str>, default: Option<T>, decoder: F) -> Result<Option<T>>
where
    F: FnOnce(Value) -> Result<T>,
{
    match raw {
        Some(raw) => decoder(parse_json(key, raw)?).map(Some),
        None => Ok(default),
    }
}

/// Parse JSON straight into a deserializable type.
pub fn coerce_deserialize<T: DeserializeOwned>(key: &str, raw: Option<&str>, default: Option<T>) -> Result<Option<T>> {
    coerce_with(key, raw, default, |value| {
        serde_json::from_value(value).map_err(|e| PropertyError::type_coercion(key, e.to_string()))
    })
}

fn parse_json(key: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .map_err(|e| PropertyError::type_coercion(key, format!("invalid JSON: {}", e)))
}
