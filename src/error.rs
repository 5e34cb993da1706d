//! Content negotiation error types.
//!
//! Every variant maps onto an HTTP status code and is rendered as a
//! JSON:API error document, so failures raised by the negotiation layer
//! and by resource handlers reach the client in the same shape:
//!
//! ```json
//! {"errors": [{"status": "415", "title": "Unsupported media type",
//!              "detail": "...", "source": {"header": "Content-Type"}}],
//!  "jsonapi": {"version": "1.0"}}
//! ```

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::JSONAPI_MEDIA_TYPE;

/// Negotiation and resource errors.
#[derive(Error, Debug)]
pub enum ConnegError {
    /// No parser accepts the request's `Content-Type`.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// No renderer satisfies the request's `Accept` header.
    #[error("Not acceptable: {0}")]
    NotAcceptable(String),

    /// A media type string could not be parsed.
    #[error("Invalid media type: {0}")]
    InvalidMediaType(String),

    /// The selected parser rejected the request body.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The selected renderer failed to produce a response body.
    #[error("Render error: {0}")]
    Render(String),

    /// Request body exceeds the configured limit (bytes).
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource type conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Semantically invalid resource document.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Server-side error.
    #[error("Server error: {0}")]
    Server(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for negotiation operations
pub type Result<T> = std::result::Result<T, ConnegError>;

impl ConnegError {
    /// HTTP status code reported for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            Self::InvalidMediaType(_) | Self::Parse(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Render(_) | Self::Config(_) | Self::Server(_) | Self::Json(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Short, human-readable summary used as the JSON:API error `title`.
    pub fn title(&self) -> &'static str {
        match self {
            Self::UnsupportedMediaType(_) => "Unsupported media type",
            Self::NotAcceptable(_) => "Not acceptable",
            Self::InvalidMediaType(_) => "Invalid media type",
            Self::Parse(_) => "Invalid request body",
            Self::Render(_) => "Rendering failed",
            Self::PayloadTooLarge(_) => "Payload too large",
            Self::NotFound(_) => "Not found",
            Self::Conflict(_) => "Conflict",
            Self::Validation(_) => "Validation error",
            Self::Config(_) | Self::Server(_) | Self::Json(_) | Self::Io(_) => {
                "Internal server error"
            },
        }
    }

    /// Request header the error points at, if any.
    pub fn source_header(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedMediaType(_) => Some("Content-Type"),
            Self::NotAcceptable(_) => Some("Accept"),
            _ => None,
        }
    }

    /// Build the JSON:API error document for this error.
    pub fn to_document(&self) -> serde_json::Value {
        let mut error = json!({
            "status": self.status().as_u16().to_string(),
            "title": self.title(),
            "detail": self.to_string(),
        });
        if let Some(header) = self.source_header() {
            error["source"] = json!({ "header": header });
        }
        json!({
            "errors": [error],
            "jsonapi": { "version": "1.0" },
        })
    }
}

impl IntoResponse for ConnegError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, "{self}");
        } else {
            tracing::debug!(%status, "{self}");
        }

        let body = self.to_document().to_string();
        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSONAPI_MEDIA_TYPE),
        );
        response
    }
}

impl From<toml::de::Error> for ConnegError {
    fn from(err: toml::de::Error) -> Self {
        ConnegError::Config(err.to_string())
    }
}

impl From<csv::Error> for ConnegError {
    fn from(err: csv::Error) -> Self {
        ConnegError::Parse(format!("CSV error: {err}"))
    }
}
