//! JSON and JSON:API handlers.

use bytes::Bytes;
use serde_json::Value;

use crate::error::{ConnegError, Result};
use crate::media::MediaType;

/// Parse a JSON request body.
pub fn parse(body: &[u8], _media_type: &MediaType) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ConnegError::Parse("request body must be JSON, got an empty body".into()));
    }
    serde_json::from_slice(body).map_err(|e| ConnegError::Parse(format!("invalid JSON: {e}")))
}

/// Render a value as compact JSON.
pub fn render(data: &Value) -> Result<Bytes> {
    serde_json::to_vec(data)
        .map(Bytes::from)
        .map_err(|e| ConnegError::Render(e.to_string()))
}
