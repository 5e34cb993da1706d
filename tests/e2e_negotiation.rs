//! End-to-end content negotiation tests.
//!
//! Drive the demo `person` application and ad-hoc resources through the
//! full router (middleware included) with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use conneg::formats::{csv, json, text};
use conneg::server::{create_router, AppState, ServerConfig};
use conneg::{Api, ContentConfig, ContentNegotiator, Document, ParsedBody};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const JSONAPI: &str = "application/vnd.api+json";

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: impl Into<Body>,
) -> Reply {
    let mut request = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = app
        .clone()
        .oneshot(request.body(body.into()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        headers,
        body,
    }
}

/// Person app seeded with "test" and "test2".
async fn person_app(negotiator: ContentNegotiator) -> Router {
    let state = Arc::new(AppState::new(ServerConfig::default().without_logging()));
    state.persons.create("test".into(), None).await;
    state.persons.create("test2".into(), Some("test2@example.com".into())).await;
    create_router(state, negotiator)
}

fn csv_negotiator() -> ContentNegotiator {
    let global = ContentConfig::new()
        .renderer("text/csv", csv::render)
        .unwrap()
        .parser("text/csv", csv::parse)
        .unwrap();
    ContentNegotiator::default().with_global(&global)
}

async fn csv_app() -> Router {
    person_app(csv_negotiator()).await
}

async fn plain_app() -> Router {
    person_app(ContentNegotiator::default()).await
}

#[tokio::test]
async fn test_csv_response() {
    let app = csv_app().await;
    let reply = send(
        &app,
        "GET",
        "/persons",
        &[("content-type", JSONAPI), ("accept", "text/csv")],
        Body::empty(),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.content_type(), "text/csv");

    let mut reader = ::csv::Reader::from_reader(&reply.body[..]);
    let headers = reader.headers().unwrap().clone();
    let name_column = headers.iter().position(|h| h == "attributes.name").unwrap();
    let names: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[name_column].to_string())
        .collect();

    assert_eq!(names.len(), 2);
    assert!(names.contains(&"test".to_string()));
    assert!(names.contains(&"test2".to_string()));
}

#[tokio::test]
async fn test_csv_request() {
    let app = csv_app().await;
    let reply = send(
        &app,
        "POST",
        "/persons",
        &[("content-type", "text/csv"), ("accept", JSONAPI)],
        "attributes.name,type\none,person\n",
    )
    .await;

    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.content_type(), JSONAPI);
    assert_eq!(reply.json()["data"]["attributes"]["name"], "one");
    assert_eq!(reply.json()["data"]["id"], "3");
}

fn fake_content_router() -> Router {
    let content = ContentConfig::new()
        .renderer("text/fake_content", text::render)
        .unwrap()
        .parser("text/fake_content", text::parse)
        .unwrap();

    Api::new(&ContentConfig::new())
        .route_with(
            "/test",
            get(|| async { Document::ok(json!("test")) }),
            &content,
        )
        .into_router()
}

#[tokio::test]
async fn test_resource_content_types() {
    let app = fake_content_router();
    let reply = send(
        &app,
        "GET",
        "/test",
        &[("content-type", "text/fake_content"), ("accept", "text/fake_content")],
        Body::empty(),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(&reply.body[..], b"test");
    assert_eq!(reply.content_type(), "text/fake_content");
}

#[tokio::test]
async fn test_resource_override_is_not_global() {
    let app = plain_app().await.merge(fake_content_router());

    let reply = send(
        &app,
        "GET",
        "/persons",
        &[("accept", "text/fake_content")],
        Body::empty(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_ACCEPTABLE);

    // The override replaced the renderer map for /test entirely.
    let reply = send(&app, "GET", "/test", &[("accept", JSONAPI)], Body::empty()).await;
    assert_eq!(reply.status, StatusCode::NOT_ACCEPTABLE);
}

fn content_arguments_router() -> Router {
    let content = ContentConfig::new()
        .parser("text/html", text::parse)
        .unwrap()
        .parser("multipart/form-data", |_body: &[u8], media_type: &conneg::MediaType| {
            Ok(json!({"boundary": media_type.param("boundary")}))
        })
        .unwrap()
        .renderer("application/json", json::render)
        .unwrap();

    Api::new(&ContentConfig::new())
        .route_with(
            "/test",
            post(|ParsedBody(body): ParsedBody| async move {
                Document::ok(body.unwrap_or_default())
            }),
            &content,
        )
        .into_router()
}

#[tokio::test]
async fn test_content_arguments() {
    let app = content_arguments_router();

    let reply = send(
        &app,
        "POST",
        "/test",
        &[("content-type", "text/html; charset=UTF-8"), ("accept", "application/json")],
        "hello",
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!("hello"));

    let reply = send(
        &app,
        "POST",
        "/test",
        &[
            ("content-type", "multipart/form-data; boundary=boundary"),
            ("accept", "application/json"),
        ],
        "--boundary\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--boundary--\r\n",
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({"boundary": "boundary"}));
}

#[tokio::test]
async fn test_accept_star() {
    let app = plain_app().await;
    let reply = send(
        &app,
        "GET",
        "/persons",
        &[("content-type", JSONAPI), ("accept", "*/*")],
        Body::empty(),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_no_accept_uses_default_renderer() {
    let app = plain_app().await;
    let reply = send(&app, "GET", "/persons", &[("content-type", JSONAPI)], Body::empty()).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.content_type(), "application/json");
    assert_eq!(reply.json()["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_without_content_type() {
    let app = plain_app().await;
    let reply = send(&app, "GET", "/persons", &[], Body::empty()).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_post_without_content_type() {
    let app = plain_app().await;
    let reply = send(&app, "POST", "/persons", &[], Body::empty()).await;

    assert_eq!(reply.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(reply.content_type(), JSONAPI);

    let error = &reply.json()["errors"][0];
    assert_eq!(error["status"], "415");
    assert_eq!(error["source"]["header"], "Content-Type");
}

#[tokio::test]
async fn test_accept_charset() {
    let app = plain_app().await;
    let reply = send(
        &app,
        "GET",
        "/persons",
        &[("accept", "application/vnd.api+json; charset=utf-8")],
        Body::empty(),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.content_type(), JSONAPI);
    assert_eq!(reply.json()["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_accept_variants() {
    let app = csv_app().await;
    let cases = [
        ("application/vnd.api+json; ext=bulk", StatusCode::NOT_ACCEPTABLE, None),
        (
            "application/vnd.api+json; ext=bulk, application/vnd.api+json",
            StatusCode::OK,
            Some(JSONAPI),
        ),
        ("text/html", StatusCode::NOT_ACCEPTABLE, None),
        ("text/html, application/*;q=0.5", StatusCode::OK, Some("application/json")),
        ("application/json;q=0.1, text/csv", StatusCode::OK, Some("text/csv")),
        ("text/csv;q=0, */*", StatusCode::OK, Some("application/json")),
        ("text/*;q=0, application/json;q=0", StatusCode::NOT_ACCEPTABLE, None),
        ("text/csv, */*;q=0", StatusCode::OK, Some("text/csv")),
        (
            "application/json;q=0.5, application/*;q=0",
            StatusCode::OK,
            Some("application/json"),
        ),
    ];

    for (accept, status, content_type) in cases {
        let reply = send(&app, "GET", "/persons", &[("accept", accept)], Body::empty()).await;
        assert_eq!(reply.status, status, "Accept: {accept}");
        if let Some(content_type) = content_type {
            assert_eq!(reply.content_type(), content_type, "Accept: {accept}");
        } else {
            assert_eq!(reply.json()["errors"][0]["status"], "406", "Accept: {accept}");
        }
    }
}

#[tokio::test]
async fn test_wrong_content_type() {
    let app = plain_app().await;

    for content_type in ["text/xml", "application/vnd.api+json; ext=bulk"] {
        let reply = send(
            &app,
            "POST",
            "/persons",
            &[("content-type", content_type)],
            r#"{"data": {"type": "person", "attributes": {"name": "x"}}}"#,
        )
        .await;
        assert_eq!(reply.status, StatusCode::UNSUPPORTED_MEDIA_TYPE, "{content_type}");
    }
}

#[tokio::test]
async fn test_person_lifecycle() {
    let app = plain_app().await;
    let json_headers = [("content-type", JSONAPI), ("accept", JSONAPI)];

    let reply = send(
        &app,
        "POST",
        "/persons",
        &json_headers,
        r#"{"data": {"type": "person", "attributes": {"name": "one", "email": "one@example.com"}}}"#,
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let id = reply.json()["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/persons/{id}");

    let reply = send(&app, "GET", &uri, &[], Body::empty()).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["data"]["attributes"]["email"], "one@example.com");

    let patch = format!(
        r#"{{"data": {{"type": "person", "id": "{id}", "attributes": {{"name": "renamed"}}}}}}"#
    );
    let reply = send(&app, "PATCH", &uri, &json_headers, patch).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["data"]["attributes"]["name"], "renamed");
    assert_eq!(reply.json()["data"]["attributes"]["email"], "one@example.com");

    let reply = send(&app, "DELETE", &uri, &[], Body::empty()).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = send(&app, "GET", &uri, &[], Body::empty()).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.content_type(), JSONAPI);
}

#[tokio::test]
async fn test_resource_errors() {
    let app = plain_app().await;
    let headers = [("content-type", JSONAPI)];

    let reply = send(
        &app,
        "POST",
        "/persons",
        &headers,
        r#"{"data": {"type": "computer", "attributes": {"name": "x"}}}"#,
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = send(
        &app,
        "POST",
        "/persons",
        &headers,
        r#"{"data": {"type": "person", "attributes": {}}}"#,
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);

    let reply = send(&app, "POST", "/persons", &headers, "{not json").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(
        &app,
        "PATCH",
        "/persons/1",
        &headers,
        r#"{"data": {"type": "person", "id": "2"}}"#,
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = send(&app, "GET", "/persons/99", &[], Body::empty()).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_body_limit() {
    let app = person_app(ContentNegotiator::default().with_max_body_size(16)).await;
    let reply = send(
        &app,
        "POST",
        "/persons",
        &[("content-type", JSONAPI)],
        r#"{"data": {"type": "person", "attributes": {"name": "long"}}}"#,
    )
    .await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_health_is_not_negotiated() {
    let app = plain_app().await;
    let reply = send(&app, "GET", "/health", &[("accept", "text/csv")], Body::empty()).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["status"], "ok");
    assert_eq!(reply.json()["persons"], 2);
}
