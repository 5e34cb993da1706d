//! Axum integration: the negotiation middleware and its extractors.
//!
//! [`negotiate`] runs in front of a route's handlers. Before the handler
//! runs it buffers the body, picks the parser (415) and the renderer
//! (406), and parses the body (400), so a rejected request never reaches
//! resource logic. Afterwards it renders any [`Document`] the handler
//! returned.
//!
//! ```rust,ignore
//! async fn create(ParsedBody(body): ParsedBody) -> Document {
//!     Document::created(body.unwrap_or_default())
//! }
//! ```

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::{header, request::Parts, HeaderMap, HeaderName, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use super::{ContentNegotiator, RendererSelection};
use crate::error::{ConnegError, Result};
use crate::media::MediaType;

/// Structured request body produced by the selected parser.
///
/// `None` when the request had no body to parse (e.g. a GET).
#[derive(Debug, Clone, Default)]
pub struct ParsedBody(pub Option<Value>);

impl ParsedBody {
    /// The parsed value, or a 400 if the request carried none.
    pub fn require(self) -> Result<Value> {
        self.0
            .ok_or_else(|| ConnegError::Parse("request body is required".into()))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ParsedBody
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<ParsedBody>().cloned().unwrap_or_default())
    }
}

/// Outcome of negotiation, visible to handlers.
#[derive(Debug, Clone)]
pub struct Negotiated {
    /// Media type the response will be rendered as.
    pub response: MediaType,
    /// Media type the request body was parsed as, if any.
    pub request: Option<MediaType>,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Negotiated
where
    S: Send + Sync,
{
    type Rejection = ConnegError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Negotiated>()
            .cloned()
            .ok_or_else(|| ConnegError::Server("route is not behind content negotiation".into()))
    }
}

/// Handler result that the middleware renders with the negotiated
/// renderer.
///
/// Outside a negotiated route it degrades to an empty response with the
/// same status.
#[derive(Debug, Clone)]
pub struct Document {
    status: StatusCode,
    data: Value,
}

impl Document {
    /// Document with an explicit status.
    pub fn new(status: StatusCode, data: Value) -> Self {
        Self { status, data }
    }

    /// `200 OK` document.
    pub fn ok(data: Value) -> Self {
        Self::new(StatusCode::OK, data)
    }

    /// `201 Created` document.
    pub fn created(data: Value) -> Self {
        Self::new(StatusCode::CREATED, data)
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Data to render.
    pub fn data(&self) -> &Value {
        &self.data
    }
}

impl IntoResponse for Document {
    fn into_response(self) -> Response {
        let mut response = self.status.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Content negotiation middleware, for use with
/// [`axum::middleware::from_fn_with_state`].
pub async fn negotiate(
    State(negotiator): State<ContentNegotiator>,
    request: Request,
    next: Next,
) -> Response {
    match run(&negotiator, request, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn run(negotiator: &ContentNegotiator, request: Request, next: Next) -> Result<Response> {
    let (mut parts, body) = request.into_parts();

    let limit = negotiator.max_body_size();
    let body = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| ConnegError::PayloadTooLarge(limit))?;

    let content_type = header_value(
        &parts.headers,
        header::CONTENT_TYPE,
        ConnegError::UnsupportedMediaType,
    )?;
    let parser = negotiator.select_parser(&parts.method, content_type, body.len())?;

    let accept = header_value(&parts.headers, header::ACCEPT, ConnegError::NotAcceptable)?;
    let renderer = negotiator.select_renderer(accept)?;

    let parsed = match &parser {
        Some(selection) => Some(negotiator.parse_body(selection, &body)?),
        None => None,
    };

    tracing::debug!(
        method = %parts.method,
        uri = %parts.uri,
        parser = ?parser.as_ref().map(|p| p.media_type.essence()),
        renderer = %renderer.media_type,
        "negotiated content"
    );

    parts.extensions.insert(ParsedBody(parsed));
    parts.extensions.insert(Negotiated {
        response: renderer.media_type.clone(),
        request: parser.map(|p| p.media_type),
    });

    let response = next.run(Request::from_parts(parts, Body::from(body))).await;
    finish(negotiator, &renderer, response)
}

/// Render a returned [`Document`]; other responses pass through untouched.
fn finish(
    negotiator: &ContentNegotiator,
    renderer: &RendererSelection,
    mut response: Response,
) -> Result<Response> {
    let Some(document) = response.extensions_mut().remove::<Document>() else {
        return Ok(response);
    };

    let rendered = negotiator.render(renderer, document.status(), document.data())?;
    let (rendered, body) = rendered.into_parts();

    // Keep headers the handler set; the negotiated Content-Type wins.
    let (mut parts, _) = response.into_parts();
    parts.status = rendered.status;
    parts.headers.remove(header::CONTENT_LENGTH);
    if let Some(content_type) = rendered.headers.get(header::CONTENT_TYPE) {
        parts.headers.insert(header::CONTENT_TYPE, content_type.clone());
    }

    Ok(Response::from_parts(parts, body))
}

fn header_value(
    headers: &HeaderMap,
    name: HeaderName,
    invalid: impl FnOnce(String) -> ConnegError,
) -> Result<Option<&str>> {
    match headers.get(&name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| invalid(format!("{name} header is not valid ASCII"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware::from_fn_with_state, routing::post, Router};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    async fn echo(negotiated: Negotiated, ParsedBody(body): ParsedBody) -> Document {
        Document::created(json!({
            "data": body,
            "meta": {"parsed_as": negotiated.request.map(|m| m.essence())},
        }))
    }

    fn app(negotiator: ContentNegotiator) -> Router {
        Router::new().route(
            "/echo",
            post(echo)
                .get(|| async { Document::ok(json!({"data": []})) })
                .layer(from_fn_with_state(negotiator, negotiate)),
        )
    }

    fn request(method: &str, headers: &[(&str, &str)], body: &'static str) -> Request {
        let mut builder = axum::http::Request::builder().method(method).uri("/echo");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_parses_and_renders() {
        let response = app(ContentNegotiator::default())
            .oneshot(request(
                "POST",
                &[("content-type", "application/json"), ("accept", "application/vnd.api+json")],
                r#"{"name": "one"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/vnd.api+json");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["name"], "one");
        assert_eq!(body["meta"]["parsed_as"], "application/json");
    }

    #[tokio::test]
    async fn test_rejects_before_handler() {
        let negotiator = ContentNegotiator::default();

        let response = app(negotiator.clone())
            .oneshot(request("POST", &[], "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(response.headers()[header::CONTENT_TYPE], crate::JSONAPI_MEDIA_TYPE);

        let response = app(negotiator.clone())
            .oneshot(request("GET", &[("accept", "image/png")], ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);

        let response = app(negotiator)
            .oneshot(request("POST", &[("content-type", "application/json")], "{oops"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let negotiator = ContentNegotiator::default().with_max_body_size(4);
        let response = app(negotiator)
            .oneshot(request("POST", &[("content-type", "application/json")], "[1,2,3,4]"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_plain_responses_pass_through() {
        let router = Router::new().route(
            "/plain",
            post(|| async { (StatusCode::ACCEPTED, "raw") })
                .layer(from_fn_with_state(ContentNegotiator::default(), negotiate)),
        );
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/plain")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"raw");
    }

    #[test]
    fn test_document_outside_negotiation_is_empty() {
        let response = Document::created(json!({"data": 1})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.extensions().get::<Document>().is_some());
    }

    #[test]
    fn test_parsed_body_require() {
        assert!(ParsedBody(None).require().is_err());
        assert_eq!(ParsedBody(Some(json!(1))).require().unwrap(), 1);
    }
}
