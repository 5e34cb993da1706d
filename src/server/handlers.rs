//! HTTP request handlers for the `person` resource.

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::state::{AppState, Person, PersonChanges};
use crate::api::Api;
use crate::error::{ConnegError, Result};
use crate::negotiation::{ContentNegotiator, Document, ParsedBody};

/// JSON:API resource type served by this application.
pub const PERSON_TYPE: &str = "person";

/// Create the API router
///
/// The `/persons` routes go through `negotiator`; `/health` is plain JSON.
pub fn create_router(state: Arc<AppState>, negotiator: ContentNegotiator) -> Router {
    let mut router = Api::with_negotiator(negotiator)
        .route("/persons", get(list_persons).post(create_person))
        .route(
            "/persons/:id",
            get(get_person).patch(update_person).delete(delete_person),
        )
        .into_router()
        .route("/health", get(health_check))
        .with_state(Arc::clone(&state));

    if state.config.logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    if state.config.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }
    router
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Seconds since startup
    pub uptime_secs: u64,
    /// Stored person count
    pub persons: usize,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        uptime_secs: state.uptime().as_secs(),
        persons: state.persons.count().await,
    })
}

async fn list_persons(State(state): State<Arc<AppState>>) -> Document {
    let persons = state.persons.list().await;
    let count = persons.len();
    let data: Vec<Value> = persons.iter().map(person_resource).collect();

    Document::ok(json!({
        "data": data,
        "meta": {"count": count},
        "jsonapi": {"version": "1.0"},
    }))
}

async fn create_person(
    State(state): State<Arc<AppState>>,
    body: ParsedBody,
) -> Result<Document> {
    let document = body.require()?;
    let changes = read_resource(&document, None)?;

    let name = changes
        .name
        .ok_or_else(|| ConnegError::Validation("attribute \"name\" is required".into()))?;
    let person = state.persons.create(name, changes.email.flatten()).await;

    tracing::info!(id = person.id, "created person");
    Ok(Document::created(single(&person)))
}

async fn get_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Document> {
    let id = person_id(&id)?;
    let person = state.persons.get(id).await.ok_or_else(|| not_found(id))?;
    Ok(Document::ok(single(&person)))
}

async fn update_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: ParsedBody,
) -> Result<Document> {
    let id = person_id(&id)?;
    let document = body.require()?;
    let changes = read_resource(&document, Some(id))?;

    let person = state
        .persons
        .update(id, changes)
        .await
        .ok_or_else(|| not_found(id))?;
    Ok(Document::ok(single(&person)))
}

async fn delete_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = person_id(&id)?;
    if state.persons.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

fn person_id(raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| ConnegError::NotFound(format!("person {raw:?}")))
}

fn not_found(id: u64) -> ConnegError {
    ConnegError::NotFound(format!("person {id}"))
}

fn single(person: &Person) -> Value {
    json!({
        "data": person_resource(person),
        "jsonapi": {"version": "1.0"},
    })
}

/// JSON:API resource object for a person.
pub fn person_resource(person: &Person) -> Value {
    json!({
        "type": PERSON_TYPE,
        "id": person.id.to_string(),
        "attributes": {
            "name": person.name,
            "email": person.email,
        },
        "links": {"self": format!("/persons/{}", person.id)},
    })
}

/// Read the primary resource of a request document.
///
/// `type` must be `person` (409 otherwise); when `id` is given the
/// document's `id`, if any, must match it. Attribute shape errors are 422.
fn read_resource(document: &Value, id: Option<u64>) -> Result<PersonChanges> {
    let data = document
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| ConnegError::Validation("document must contain a \"data\" object".into()))?;

    match data.get("type").and_then(Value::as_str) {
        Some(PERSON_TYPE) => {},
        Some(other) => {
            return Err(ConnegError::Conflict(format!(
                "resource type {other:?} does not match endpoint type {PERSON_TYPE:?}"
            )))
        },
        None => return Err(ConnegError::Validation("resource \"type\" is required".into())),
    }

    if let (Some(expected), Some(given)) = (id, data.get("id")) {
        let matches = match given {
            Value::String(s) => s.parse::<u64>().ok() == Some(expected),
            Value::Number(n) => n.as_u64() == Some(expected),
            _ => false,
        };
        if !matches {
            return Err(ConnegError::Conflict(format!(
                "resource id {given} does not match endpoint id {expected}"
            )));
        }
    }

    let empty = Map::new();
    let attributes = match data.get("attributes") {
        None => &empty,
        Some(Value::Object(attributes)) => attributes,
        Some(_) => return Err(ConnegError::Validation("\"attributes\" must be an object".into())),
    };

    let name = match attributes.get("name") {
        None => None,
        Some(Value::String(name)) if !name.trim().is_empty() => Some(name.clone()),
        Some(_) => {
            return Err(ConnegError::Validation(
                "attribute \"name\" must be a non-empty string".into(),
            ))
        },
    };
    let email = match attributes.get("email") {
        None => None,
        Some(Value::Null) => Some(None),
        Some(Value::String(email)) => Some(Some(email.clone())),
        Some(_) => {
            return Err(ConnegError::Validation(
                "attribute \"email\" must be a string or null".into(),
            ))
        },
    };

    Ok(PersonChanges { name, email })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_resource_shape() {
        let person = Person {
            id: 7,
            name: "test".into(),
            email: None,
        };
        let resource = person_resource(&person);
        assert_eq!(resource["type"], "person");
        assert_eq!(resource["id"], "7");
        assert_eq!(resource["attributes"]["name"], "test");
        assert!(resource["attributes"]["email"].is_null());
    }

    #[test]
    fn test_read_resource() {
        let changes = read_resource(
            &json!({"data": {"type": "person", "attributes": {"name": "one"}}}),
            None,
        )
        .unwrap();
        assert_eq!(changes.name.as_deref(), Some("one"));
        assert!(changes.email.is_none());

        let err = read_resource(&json!({"data": {"type": "computer"}}), None).unwrap_err();
        assert!(matches!(err, ConnegError::Conflict(_)));

        let err = read_resource(&json!({"data": []}), None).unwrap_err();
        assert!(matches!(err, ConnegError::Validation(_)));

        let err = read_resource(
            &json!({"data": {"type": "person", "attributes": {"name": 3}}}),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConnegError::Validation(_)));
    }

    #[test]
    fn test_read_resource_checks_id() {
        let document = json!({"data": {"type": "person", "id": "2", "attributes": {"email": null}}});

        let changes = read_resource(&document, Some(2)).unwrap();
        assert_eq!(changes.email, Some(None));

        let err = read_resource(&document, Some(3)).unwrap_err();
        assert!(matches!(err, ConnegError::Conflict(_)));
    }

    #[test]
    fn test_person_id() {
        assert_eq!(person_id("12").unwrap(), 12);
        assert!(matches!(person_id("abc"), Err(ConnegError::NotFound(_))));
    }
}
