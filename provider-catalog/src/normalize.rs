//! Response-shape normalization
//!
//! The backend is inconsistent about envelopes: the same logical list may
//! arrive as a bare JSON array or wrapped under `tracks`, `items`, `data`,
//! or `result`. These helpers probe the known shapes in a fixed order,
//! taking the first non-empty list so an empty envelope does not shadow a
//! populated one later in the order, and fail with `MalformedResponse` when
//! nothing matches, so callers never see a silently empty result for an
//! unrecognized payload.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::types::{Track, User};

/// Envelope keys probed for list payloads, in precedence order.
const LIST_KEYS: [&str; 4] = ["tracks", "items", "data", "result"];

/// Extract the track list from a response body of any known shape.
pub fn extract_track_list(body: &[u8], context: &str) -> Result<Vec<Track>> {
    let value = parse_json(body, context)?;
    let array = extract_array(&value, context)?;

    serde_json::from_value(Value::Array(array)).map_err(|e| ApiError::MalformedResponse {
        context: format!("{}: invalid track record: {}", context, e),
    })
}

/// Extract the raw element list from a response body of any known shape.
///
/// Used for selection items, which may be track records or bare IDs.
pub fn extract_raw_list(body: &[u8], context: &str) -> Result<Vec<Value>> {
    let value = parse_json(body, context)?;
    extract_array(&value, context)
}

/// Normalize a user payload.
///
/// Probes `result` envelope, then the bare object, then a `user` envelope.
pub fn normalize_user(body: &[u8], context: &str) -> Result<User> {
    let value = parse_json(body, context)?;

    if let Some(inner) = value.get("result") {
        if inner.is_object() {
            return from_value(inner.clone(), context);
        }
    }

    if value.get("_id").is_some() || value.get("email").is_some() {
        return from_value(value, context);
    }

    if let Some(inner) = value.get("user") {
        if inner.is_object() {
            return from_value(inner.clone(), context);
        }
    }

    Err(ApiError::MalformedResponse {
        context: format!("{}: no user object in response", context),
    })
}

fn parse_json(body: &[u8], context: &str) -> Result<Value> {
    serde_json::from_slice(body).map_err(|e| ApiError::MalformedResponse {
        context: format!("{}: invalid JSON: {}", context, e),
    })
}

fn extract_array(value: &Value, context: &str) -> Result<Vec<Value>> {
    if let Some(array) = value.as_array() {
        return Ok(array.clone());
    }

    if value.is_object() {
        let mut saw_empty_envelope = false;
        for key in LIST_KEYS {
            if let Some(array) = value.get(key).and_then(Value::as_array) {
                if !array.is_empty() {
                    return Ok(array.clone());
                }
                saw_empty_envelope = true;
            }
        }
        // Every recognized envelope was empty, so the list really is empty.
        if saw_empty_envelope {
            return Ok(Vec::new());
        }
    }

    Err(ApiError::MalformedResponse {
        context: format!("{}: no list found in response", context),
    })
}

fn from_value<T: DeserializeOwned>(value: Value, context: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ApiError::MalformedResponse {
        context: format!("{}: {}", context, e),
    })
}
