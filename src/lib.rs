//! # Conneg - content negotiation for JSON:API services
//!
//! Per-media-type request parsers and response renderers for axum
//! applications, selected from the `Content-Type` and `Accept` headers.
//!
//! ## Features
//!
//! - **Pluggable formats**: register any parser/renderer pair under a media
//!   type; JSON, JSON:API, CSV and plain text ship built in
//! - **HTTP negotiation**: `q` weights, `*/*` and `type/*` wildcards,
//!   parameter suffixes (`; charset=...`, `; boundary=...`)
//! - **Per-resource overrides**: a route can replace the global handler maps
//!   without affecting any other route
//! - **JSON:API media type rules**: parameterised `application/vnd.api+json`
//!   is refused with 415/406
//!
//! ## Request Flow
//!
//! ```text
//! Client                  negotiate middleware                   Handler
//!    |                              |                                |
//!    |---- POST (Content-Type) ---->| select parser     (415)        |
//!    |      (Accept)                | select renderer   (406)        |
//!    |                              | parse body        (400)        |
//!    |                              |------- ParsedBody ------------>|
//!    |                              |<------ Document ---------------|
//!    |<--- rendered body -----------| render, set Content-Type       |
//! ```
//!
//! Negotiation failures are answered before the handler runs, as JSON:API
//! error documents.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use axum::routing::get;
//! use conneg::{Api, ContentConfig, Document, ParsedBody};
//! use conneg::formats::csv;
//!
//! let global = ContentConfig::new()
//!     .parser("text/csv", csv::parse)?
//!     .renderer("text/csv", csv::render)?;
//!
//! let app = Api::new(&global)
//!     .route("/persons", get(list).post(create))
//!     .into_router();
//!
//! async fn create(body: ParsedBody) -> conneg::Result<Document> {
//!     let document = body.require()?;
//!     Ok(Document::created(document))
//! }
//! ```
//!
//! ## Modules
//!
//! - [`media`]: Media type and `Accept` header parsing
//! - [`registry`]: Parser and renderer registries
//! - [`negotiation`]: Handler selection and the axum middleware
//! - [`formats`]: Built-in JSON, CSV and text handlers
//! - [`api`]: Route registration with per-resource overrides
//! - [`server`]: Demo JSON:API application
//! - [`transport`]: TCP serving
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod api;
pub mod config;
pub mod error;
pub mod formats;
pub mod media;
pub mod negotiation;
pub mod registry;
pub mod server;
pub mod transport;

// Re-exports for convenience
pub use api::Api;
pub use config::Config;
pub use error::{ConnegError, Result};
pub use media::{AcceptHeader, MediaType};
pub use negotiation::{ContentConfig, ContentNegotiator, Document, Negotiated, ParsedBody};
pub use registry::{Parser, ParserRegistry, Renderer, RendererRegistry};
pub use server::{AppState, ServerConfig};
pub use transport::{TcpTransport, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plain JSON media type; the default response format.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// JSON:API media type.
pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";
