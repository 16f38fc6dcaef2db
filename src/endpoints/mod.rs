//! Typed operations over [`ApiClient`](crate::client::ApiClient), one module
//! per backend resource. Each operation declares the cache tags it provides
//! or invalidates and unwraps the backend's `{ success, message, data }`
//! envelope.

mod admin;
mod auth;
mod cart;
mod categories;
mod orders;
mod products;

pub use auth::{decode_token_claims, TokenError};

use crate::client::ApiError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// `data` of the response envelope, `Null` when absent.
fn data(mut envelope: Value) -> Value {
    envelope.get_mut("data").map(Value::take).unwrap_or(Value::Null)
}

fn decode<D: DeserializeOwned>(value: Value) -> Result<D, ApiError> {
    serde_json::from_value(value).map_err(ApiError::from)
}

/// Lists come back as `data`, or `data.result` for paginated resources;
/// a missing list decodes as empty.
fn decode_list<D: DeserializeOwned>(envelope: Value) -> Result<Vec<D>, ApiError> {
    match data(envelope) {
        Value::Null => Ok(Vec::new()),
        Value::Object(mut page) if page.contains_key("result") => match page.remove("result") {
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(list) => decode(list),
        },
        list => decode(list),
    }
}

fn to_body<S: Serialize>(body: &S) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Validation(format!("invalid request body: {e}")))
}

fn require(value: &str, what: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::Validation(format!("{what} is required")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_list_accepts_plain_and_paged_envelopes() {
        let plain: Vec<u32> = decode_list(json!({"data": [1, 2]})).unwrap();
        let paged: Vec<u32> = decode_list(json!({"data": {"result": [3], "meta": {"total": 1}}})).unwrap();
        let missing: Vec<u32> = decode_list(json!({"success": true})).unwrap();
        assert_eq!(plain, vec![1, 2]);
        assert_eq!(paged, vec![3]);
        assert!(missing.is_empty());
    }

    #[test]
    fn require_rejects_blank_values() {
        assert!(require("  ", "Product id").is_err());
        assert!(require("p1", "Product id").is_ok());
    }
}
