//! Plain text handlers.
//!
//! The parser decodes the body according to the `charset` parameter and
//! yields a JSON string; the renderer writes strings verbatim and any other
//! value as its JSON text.

use bytes::Bytes;
use serde_json::Value;

use crate::error::{ConnegError, Result};
use crate::media::MediaType;

/// Decode a text body into a string value.
pub fn parse(body: &[u8], media_type: &MediaType) -> Result<Value> {
    let charset = media_type.charset().unwrap_or("utf-8").to_ascii_lowercase();

    let text = match charset.as_str() {
        "utf-8" | "utf8" => String::from_utf8(body.to_vec())
            .map_err(|e| ConnegError::Parse(format!("body is not valid UTF-8: {e}")))?,
        "us-ascii" | "ascii" => {
            if !body.is_ascii() {
                return Err(ConnegError::Parse("body is not valid US-ASCII".into()));
            }
            String::from_utf8_lossy(body).into_owned()
        },
        // Latin-1 code points coincide with the first 256 Unicode scalars.
        "iso-8859-1" | "latin1" => body.iter().map(|&b| char::from(b)).collect(),
        other => {
            return Err(ConnegError::Parse(format!("unsupported charset {other:?}")));
        },
    };

    Ok(Value::String(text))
}

/// Render a value as text.
pub fn render(data: &Value) -> Result<Bytes> {
    Ok(match data {
        Value::String(s) => Bytes::from(s.clone()),
        other => Bytes::from(other.to_string()),
    })
}
