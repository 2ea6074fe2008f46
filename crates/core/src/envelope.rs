//! Normalization of list response shapes.
//!
//! List endpoints of the forum API answer in one of three shapes depending on
//! the route and the number of rows: a bare entity, a JSON array, or an
//! object with a `data` array. Every list boundary goes through
//! [`parse_list`], which accepts all three.
//!
//! Shape precedence:
//!
//! 1. an object carrying `_id` is a single entity, returned as a one-element list
//! 2. an array is returned as-is
//! 3. an object whose `data` member is an array yields that array
//! 4. anything else is an empty list
//!
//! Shape sniffing never fails. Decoding the items can, and reports which
//! item was malformed.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Errors decoding normalized items.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// An item of a list did not match the expected entity shape.
    #[error("list item {index} has an unexpected shape: {source}")]
    Item {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    /// A single-entity response did not match the expected shape.
    #[error("entity has an unexpected shape: {0}")]
    Entity(#[source] serde_json::Error),
}

/// Flatten any supported envelope into its raw items.
#[must_use]
pub fn normalize(body: Value) -> Vec<Value> {
    match body {
        Value::Object(map) if map.contains_key("_id") => vec![Value::Object(map)],
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Normalize a list response and decode each item.
///
/// # Errors
///
/// Returns [`EnvelopeError::Item`] for the first item that fails to decode.
pub fn parse_list<T: DeserializeOwned>(body: Value) -> Result<Vec<T>, EnvelopeError> {
    normalize(body)
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|source| EnvelopeError::Item { index, source })
        })
        .collect()
}

/// Decode a single-entity mutation response.
///
/// Mutations answer either with the entity itself or wrapped under `key`
/// (`{"post": {...}}`, `{"comment": {...}}`).
///
/// # Errors
///
/// Returns [`EnvelopeError::Entity`] if neither form decodes.
pub fn parse_entity<T: DeserializeOwned>(body: Value, key: &str) -> Result<T, EnvelopeError> {
    let inner = match body {
        Value::Object(mut map) if !map.contains_key("_id") => match map.remove(key) {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    };
    serde_json::from_value(inner).map_err(EnvelopeError::Entity)
}
